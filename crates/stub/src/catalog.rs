//! Seeded book catalog

use apiprobe_common::Book;

struct Seed {
    isbn: &'static str,
    title: &'static str,
    sub_title: &'static str,
    author: &'static str,
    publish_date: &'static str,
    publisher: &'static str,
    pages: u32,
    description: &'static str,
    website: &'static str,
}

const SEEDS: &[Seed] = &[
    Seed {
        isbn: "9781449325862",
        title: "Git Pocket Guide",
        sub_title: "A Working Introduction",
        author: "Richard E. Silverman",
        publish_date: "2020-06-04T08:48:39.000Z",
        publisher: "O'Reilly Media",
        pages: 234,
        description: "This pocket guide is the perfect on-the-job companion to Git, the distributed version control system.",
        website: "http://chimera.labs.oreilly.com/books/1230000000561/index.html",
    },
    Seed {
        isbn: "9781449331818",
        title: "Learning JavaScript Design Patterns",
        sub_title: "A JavaScript and jQuery Developer's Guide",
        author: "Addy Osmani",
        publish_date: "2020-06-04T09:11:40.000Z",
        publisher: "O'Reilly Media",
        pages: 254,
        description: "With Learning JavaScript Design Patterns, you'll learn how to write beautiful, structured, and maintainable JavaScript.",
        website: "http://www.addyosmani.com/resources/essentialjsdesignpatterns/book/",
    },
    Seed {
        isbn: "9781449337711",
        title: "Designing Evolvable Web APIs with ASP.NET",
        sub_title: "Harnessing the Power of the Web",
        author: "Glenn Block et al.",
        publish_date: "2020-06-04T09:12:43.000Z",
        publisher: "O'Reilly Media",
        pages: 238,
        description: "Design and build Web APIs for a broad range of clients using ASP.NET Web API.",
        website: "http://chimera.labs.oreilly.com/books/1234000001708/index.html",
    },
    Seed {
        isbn: "9781449365035",
        title: "Speaking JavaScript",
        sub_title: "An In-Depth Guide for Programmers",
        author: "Axel Rauschmayer",
        publish_date: "2014-02-01T00:00:00.000Z",
        publisher: "O'Reilly Media",
        pages: 460,
        description: "Like it or not, JavaScript is everywhere these days, from browser to server to mobile.",
        website: "http://speakingjs.com/",
    },
    Seed {
        isbn: "9781491904244",
        title: "You Don't Know JS",
        sub_title: "ES6 & Beyond",
        author: "Kyle Simpson",
        publish_date: "2015-12-27T00:00:00.000Z",
        publisher: "O'Reilly Media",
        pages: 278,
        description: "No matter how much experience you have with JavaScript, odds are you don't fully understand the language.",
        website: "https://github.com/getify/You-Dont-Know-JS/tree/master/es6%20&%20beyond",
    },
    Seed {
        isbn: "9781491950296",
        title: "Programming JavaScript Applications",
        sub_title: "Robust Web Architecture with Node, HTML5, and Modern JS Libraries",
        author: "Eric Elliott",
        publish_date: "2014-07-01T00:00:00.000Z",
        publisher: "O'Reilly Media",
        pages: 254,
        description: "Take advantage of JavaScript's power to build robust web-scale or enterprise applications that are easy to extend and maintain.",
        website: "http://chimera.labs.oreilly.com/books/1234000000262/index.html",
    },
    Seed {
        isbn: "9781593275846",
        title: "Eloquent JavaScript, Second Edition",
        sub_title: "A Modern Introduction to Programming",
        author: "Marijn Haverbeke",
        publish_date: "2014-12-14T00:00:00.000Z",
        publisher: "No Starch Press",
        pages: 472,
        description: "JavaScript lies at the heart of almost every modern web application, from social apps to the newest browser-based games.",
        website: "http://eloquentjavascript.net/",
    },
    Seed {
        isbn: "9781593277574",
        title: "Understanding ECMAScript 6",
        sub_title: "The Definitive Guide for JavaScript Developers",
        author: "Nicholas C. Zakas",
        publish_date: "2016-09-03T00:00:00.000Z",
        publisher: "No Starch Press",
        pages: 352,
        description: "ECMAScript 6 represents the biggest update to the core of JavaScript in the history of the language.",
        website: "https://leanpub.com/understandinges6/read",
    },
];

/// The eight books every fresh stub starts with
pub fn seed_catalog() -> Vec<Book> {
    SEEDS
        .iter()
        .map(|s| Book {
            isbn: s.isbn.to_string(),
            title: s.title.to_string(),
            sub_title: Some(s.sub_title.to_string()),
            author: s.author.to_string(),
            publish_date: s.publish_date.to_string(),
            publisher: s.publisher.to_string(),
            pages: s.pages,
            description: s.description.to_string(),
            website: s.website.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_matches_known_isbns() {
        let catalog = seed_catalog();
        let isbns: Vec<&str> = catalog.iter().map(|b| b.isbn.as_str()).collect();
        assert_eq!(isbns, apiprobe_common::payload::test_book_isbns());
    }

    #[test]
    fn test_seed_validates_against_book_schema() {
        for book in seed_catalog() {
            let value = serde_json::to_value(&book).unwrap();
            apiprobe_common::schema::book().check(&value).unwrap();
        }
    }
}
