//! Remote document models.
//!
//! Documents in the remote store are addressed by opaque string ids wrapped
//! in typed references so a list id can never be passed where a user id is
//! expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! doc_ref {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

doc_ref!(
    /// Reference to a document in the `users` collection.
    UserRef
);
doc_ref!(
    /// Reference to a document in the `grocery_lists` collection.
    ListRef
);
doc_ref!(
    /// Reference to a document in the `items` collection.
    ItemRef
);

/// A grocery-list line item as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: ItemRef,
    pub store_id: String,
    pub name: String,
    pub price: String,
    pub quantity: u32,
    pub favorited: bool,
    /// Creation timestamp (Unix milliseconds)
    pub date_added: i64,
    pub grocery_list: ListRef,
}

/// Monthly spending totals, indexed January = 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Expenses {
    pub months: [f64; 12],
}

impl Expenses {
    /// Total over all months.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.months.iter().sum()
    }
}
