//! Product reviews, consumed for average ratings.

use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub product_id: ProductId,
    pub reviewer: UserId,

    /// Star rating, 1 to 5.
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// Arithmetic mean of the ratings, or 0 when there are none.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: u64 = reviews.iter().map(|r| r.rating as u64).sum();
    sum as f64 / reviews.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: u8) -> Review {
        Review {
            product_id: ProductId::new("p1"),
            reviewer: UserId::new("b@example.com"),
            rating,
            comment: String::new(),
        }
    }

    #[test]
    fn test_average_of_none_is_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[review(5), review(4), review(3)]), 4.0);
        assert_eq!(average_rating(&[review(5), review(4)]), 4.5);
    }
}
