//! Deterministic review data for benchmarks and demos.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::Dataset;
use crate::record::{Lenient, ListField, RawReview};

struct Title {
    id: &'static str,
    title: &'static str,
    year: i32,
    genres: &'static str,
    directors: &'static str,
    imdb_rating: f64,
}

const TITLES: &[Title] = &[
    Title { id: "tt0468569", title: "The Dark Knight", year: 2008, genres: "Action,Crime,Drama", directors: "Christopher Nolan", imdb_rating: 9.0 },
    Title { id: "tt1375666", title: "Inception", year: 2010, genres: "Action,Sci-Fi,Thriller", directors: "Christopher Nolan", imdb_rating: 8.8 },
    Title { id: "tt1345836", title: "The Dark Knight Rises", year: 2012, genres: "Action,Drama", directors: "Christopher Nolan", imdb_rating: 8.4 },
    Title { id: "tt0111161", title: "The Shawshank Redemption", year: 1994, genres: "Drama", directors: "Frank Darabont", imdb_rating: 9.3 },
    Title { id: "tt0068646", title: "The Godfather", year: 1972, genres: "Crime,Drama", directors: "Francis Ford Coppola", imdb_rating: 9.2 },
    Title { id: "tt0110912", title: "Pulp Fiction", year: 1994, genres: "Crime,Drama", directors: "Quentin Tarantino", imdb_rating: 8.9 },
    Title { id: "tt0133093", title: "The Matrix", year: 1999, genres: "Action,Sci-Fi", directors: "Lana Wachowski,Lilly Wachowski", imdb_rating: 8.7 },
    Title { id: "tt0816692", title: "Interstellar", year: 2014, genres: "Adventure,Drama,Sci-Fi", directors: "Christopher Nolan", imdb_rating: 8.7 },
    Title { id: "tt0113277", title: "Heat", year: 1995, genres: "Action,Crime,Drama", directors: "Michael Mann", imdb_rating: 8.3 },
    Title { id: "tt0078748", title: "Alien", year: 1979, genres: "Horror,Sci-Fi", directors: "Ridley Scott", imdb_rating: 8.5 },
    Title { id: "tt0245429", title: "Spirited Away", year: 2001, genres: "Animation,Adventure,Family", directors: "Hayao Miyazaki", imdb_rating: 8.6 },
    Title { id: "tt0114369", title: "Se7en", year: 1995, genres: "Crime,Drama,Mystery", directors: "David Fincher", imdb_rating: 8.6 },
    Title { id: "tt0407887", title: "The Departed", year: 2006, genres: "Crime,Drama,Thriller", directors: "Martin Scorsese", imdb_rating: 8.5 },
    Title { id: "tt1853728", title: "Django Unchained", year: 2012, genres: "Drama,Western", directors: "Quentin Tarantino", imdb_rating: 8.5 },
    Title { id: "tt0088763", title: "Back to the Future", year: 1985, genres: "Adventure,Comedy,Sci-Fi", directors: "Robert Zemeckis", imdb_rating: 8.5 },
    Title { id: "tt6751668", title: "Parasite", year: 2019, genres: "Drama,Thriller", directors: "Bong Joon Ho", imdb_rating: 8.5 },
];

const STARS: &[&str] = &[
    "Christian Bale", "Heath Ledger", "Leonardo DiCaprio", "Morgan Freeman", "Al Pacino",
    "Robert De Niro", "Keanu Reeves", "Sigourney Weaver", "Brad Pitt", "Song Kang-ho",
];

const OPENERS: &[&str] = &[
    "Great acting", "Solid direction", "Weak script", "Stunning visuals", "Brilliant score",
    "Predictable plot", "Great pacing", "Flat characters",
];

const BODIES: &[&str] = &[
    "and a story that keeps you guessing",
    "though the second half drags",
    "with a memorable villain",
    "but the ending felt rushed",
    "carried by an excellent cast",
    "and dialogue that lands every time",
];

const VERDICTS: &[&str] = &["Must watch", "Worth it", "Mixed feelings", "Skip it", "Instant classic"];

/// The reviewer the benchmark's user lookup asks for.
pub const SAMPLE_USER: &str = "user123";

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default()
}

fn user_count(reviews: usize) -> usize {
    (reviews / 8).max(150)
}

fn record(rng: &mut StdRng, title: &Title, user: usize, rating: i64, content: String) -> RawReview {
    let day = start_date() + Duration::days(rng.gen_range(0..3650));
    let total_votes = rng.gen_range(0..60);
    let helpful_votes = if total_votes == 0 { 0 } else { rng.gen_range(0..=total_votes) };
    let stars: Vec<String> = (0..2)
        .map(|_| STARS[rng.gen_range(0..STARS.len())].to_string())
        .collect();

    RawReview {
        movie_id: Some(title.id.to_string()),
        movie_title: Some(title.title.to_string()),
        year: Some(Lenient::Number(title.year as f64)),
        genres: Some(ListField::Text(title.genres.to_string())),
        directors: Some(ListField::Text(title.directors.to_string())),
        stars: Some(ListField::Items(stars)),
        imdb_rating: Some(Lenient::Number(title.imdb_rating)),
        user_id: Some(format!("user{user}")),
        username: Some(format!("reviewer_{user}")),
        rating: Some(Lenient::Number(rating as f64)),
        review_title: Some(VERDICTS[rng.gen_range(0..VERDICTS.len())].to_string()),
        review_content: Some(content),
        review_date: Some(day.format("%Y-%m-%d").to_string()),
        helpful_votes: Some(Lenient::Number(helpful_votes as f64)),
        total_votes: Some(Lenient::Number(total_votes as f64)),
        spoiler_tag: Some(Lenient::Text(rng.gen_ratio(1, 10).to_string())),
        verified_purchase: Some(Lenient::Text(rng.gen_bool(0.6).to_string())),
    }
}

/// Generate `reviews` reviews from `seed`. The same inputs always produce the
/// same dataset. The first review is always by [`SAMPLE_USER`] about
/// "The Dark Knight".
pub fn generate(reviews: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let users = user_count(reviews);
    let mut records = Vec::with_capacity(reviews);

    for i in 0..reviews {
        let (title, user) = if i == 0 {
            (&TITLES[0], 123)
        } else {
            // Skew towards the first titles so some movies gather many reviews.
            let a = rng.gen_range(0..TITLES.len());
            let b = rng.gen_range(0..TITLES.len());
            (&TITLES[a.min(b)], rng.gen_range(0..users))
        };
        let bias: i64 = (title.imdb_rating - 8.0).round() as i64;
        let rating = (rng.gen_range(1..=10) + bias).clamp(1, 10);
        let content = format!(
            "{} {}.",
            OPENERS[rng.gen_range(0..OPENERS.len())],
            BODIES[rng.gen_range(0..BODIES.len())]
        );
        records.push(record(&mut rng, title, user, rating, content));
    }

    Dataset::from_records(records)
}
