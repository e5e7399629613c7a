pub mod purchase;
pub mod report;
pub mod team;

pub use purchase::{NewPurchase, NewPurchaseItem, Purchase, PurchaseItem, PurchaseWithItems};
pub use report::{KpiSet, ProductTotal, TeamTotal};
pub use team::Team;
