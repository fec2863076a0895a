pub mod plan;
pub mod user;

pub use plan::{NewPlan, Plan, PlanSummary};
pub use user::{NewUser, User, UserSummary};

/// Collection holding user accounts
pub const USERS: &str = "users";

/// Collection holding plan documents
pub const PLANS: &str = "plans";
