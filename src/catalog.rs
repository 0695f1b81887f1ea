//! Static course catalog.
//!
//! Courses are fixed at build time; they are never created or destroyed at
//! runtime. Prices are the amounts actually charged at checkout.

use crate::types::{Lamports, LAMPORTS_PER_SOL};
use serde::Serialize;
use std::collections::HashMap;

/// Course identifier.
pub type CourseId = u32;

/// Pricing tier of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Single-topic course at the standard price.
    Regular,
    /// Bundle sold at a discount from its list price.
    Premium,
}

/// A course offered in the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Course {
    /// Course identifier.
    pub id: CourseId,
    /// Display title.
    pub title: &'static str,
    /// Language taught.
    pub language: &'static str,
    /// Amount charged.
    pub price: Lamports,
    /// List price before discount; only set for premium bundles.
    pub regular_price: Option<Lamports>,
    /// Pricing tier.
    pub tier: Tier,
}

const fn sol_millis(millis: u64) -> Lamports {
    Lamports(millis * (LAMPORTS_PER_SOL / 1_000))
}

const fn regular(id: CourseId, title: &'static str, language: &'static str) -> Course {
    Course {
        id,
        title,
        language,
        price: sol_millis(100),
        regular_price: None,
        tier: Tier::Regular,
    }
}

const fn premium(
    id: CourseId,
    title: &'static str,
    language: &'static str,
    list_millis: u64,
    sale_millis: u64,
) -> Course {
    Course {
        id,
        title,
        language,
        price: sol_millis(sale_millis),
        regular_price: Some(sol_millis(list_millis)),
        tier: Tier::Premium,
    }
}

static COURSES: [Course; 9] = [
    regular(1, "100 Essential Spanish Nouns", "Spanish"),
    regular(2, "Business English Phrases", "English"),
    regular(3, "Japanese Kanji Basics", "Japanese"),
    regular(4, "French Conversation Starters", "French"),
    regular(5, "German Grammar Essentials", "German"),
    regular(6, "Italian Food Vocabulary", "Italian"),
    premium(101, "Complete Spanish Course Bundle", "Spanish", 500, 350),
    premium(102, "Business English Mastery", "English", 600, 450),
    premium(103, "Japanese Immersion Pack", "Japanese", 550, 400),
];

/// Every course in the catalog, in marketplace order.
#[must_use]
pub fn all() -> &'static [Course] {
    &COURSES
}

/// Look up a course by id.
#[must_use]
pub fn course(id: CourseId) -> Option<&'static Course> {
    COURSES.iter().find(|c| c.id == id)
}

/// Map of course id to charged price, as consumed by the batch helpers.
#[must_use]
pub fn price_table() -> HashMap<CourseId, Lamports> {
    COURSES.iter().map(|c| (c.id, c.price)).collect()
}
