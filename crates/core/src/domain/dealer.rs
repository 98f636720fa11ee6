use serde::{Deserialize, Serialize};

/// One dealership to call about one listed vehicle. Input-only; never
/// mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealerQuery {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub zipcode: String,
    pub dealer_name: String,
    /// Integer currency units, as is every price in this system.
    pub msrp: i64,
    pub listing_price: i64,
    /// True once a competing offer exists and the call should negotiate
    /// against it rather than collect a first quote.
    pub is_dealing: bool,
    /// Present iff `is_dealing`.
    #[serde(default)]
    pub competing_price: Option<i64>,
    pub phone_number: String,
    pub user_id: String,
}
