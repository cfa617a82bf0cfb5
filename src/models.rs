use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use validator::Validate;

use crate::entities::{actor, category, genre, movie, movie_short, rating_star, review};

/// One page of a paginated listing. `number` is 1-based.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self { items: Vec::new(), number: 1, num_pages: 1, total: 0 }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}

/// Shared context for every public page: the header menu, the "last movies"
/// block and the genre/year filter sidebar.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub categories: Vec<category::Model>,
    pub last_movies: Vec<movie::Model>,
    pub genres: Vec<genre::Model>,
    pub years: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReviewNode {
    pub review: review::Model,
    pub replies: Vec<ReviewNode>,
}

/// Arranges a movie's reviews into reply trees. Roots are reviews without a
/// parent, or whose parent is not among `reviews`. Input order is kept among
/// siblings.
pub fn review_tree(reviews: Vec<review::Model>) -> Vec<ReviewNode> {
    let ids: HashSet<i32> = reviews.iter().map(|r| r.id).collect();
    let mut children: HashMap<i32, Vec<review::Model>> = HashMap::new();
    let mut roots = Vec::new();

    for review in reviews {
        match review.parent_id {
            Some(parent) if ids.contains(&parent) && parent != review.id => {
                children.entry(parent).or_default().push(review)
            }
            _ => roots.push(review),
        }
    }

    let mut visited = HashSet::new();
    roots.into_iter().map(|r| attach(r, &mut children, &mut visited)).collect()
}

fn attach(
    review: review::Model,
    children: &mut HashMap<i32, Vec<review::Model>>,
    visited: &mut HashSet<i32>,
) -> ReviewNode {
    visited.insert(review.id);
    let mut replies = Vec::new();
    for child in children.remove(&review.id).unwrap_or_default() {
        if !visited.contains(&child.id) {
            replies.push(attach(child, children, visited));
        }
    }
    ReviewNode { review, replies }
}

/// Returns true if following `parent` links from any review loops back to it.
pub fn has_parent_cycle(parents: &HashMap<i32, Option<i32>>) -> bool {
    for &start in parents.keys() {
        let mut seen = HashSet::from([start]);
        let mut current = parents.get(&start).copied().flatten();
        while let Some(id) = current {
            if !seen.insert(id) {
                return true;
            }
            current = parents.get(&id).copied().flatten();
        }
    }
    false
}

#[derive(Clone, Debug)]
pub struct MovieDetail {
    pub movie: movie::Model,
    pub category: Option<category::Model>,
    pub genres: Vec<genre::Model>,
    pub actors: Vec<actor::Model>,
    pub directors: Vec<actor::Model>,
    pub shorts: Vec<movie_short::Model>,
    pub reviews: Vec<ReviewNode>,
    /// Choices for the (empty) rating form, highest value first.
    pub stars: Vec<rating_star::Model>,
}

#[derive(Clone, Debug)]
pub struct ActorDetail {
    pub actor: actor::Model,
    pub acted_in: Vec<movie::Model>,
    pub directed: Vec<movie::Model>,
}

/// Raw rating submission. Ids are parsed by the handler so that malformed
/// values fail validation instead of being rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct RatingForm {
    #[serde(default)]
    pub movie: String,
    #[serde(default)]
    pub star: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ReviewForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[serde(default)]
    #[validate(email, length(max = 254))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    #[serde(default)]
    pub parent: Option<String>,
}

impl ReviewForm {
    /// The parent review id, `Ok(None)` when absent or blank.
    pub fn parent_id(&self) -> Result<Option<i32>, std::num::ParseIntError> {
        match self.parent.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}
