//! # Frontdesk Client
//!
//! REST interface to the salon collaborator: paginated listings with a
//! tolerant envelope, a targeted single-record fetch, and fire-and-confirm
//! mutation commands.
//!
//! The engine consumes the [`Backend`] trait, never the HTTP type, so the
//! in-memory double from `frontdesk-testing` can stand in during tests.
//!
//! ## Example
//!
//! ```no_run
//! use frontdesk_client::{BackendClient, Backend, PageQuery};
//! use frontdesk_core::SalonId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BackendClient::new("http://localhost:8080", SalonId::new("salon-1"));
//!     let page = client.list_today_appointments(&PageQuery::default()).await?;
//!     println!("{} appointments today", page.total_elements);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod http;
pub mod page;

// Re-export main types for convenience
pub use backend::{Actor, ActorRole, Backend, BookingRequest, CommandReceipt, RequestedService};
pub use error::ClientError;
pub use http::BackendClient;
pub use page::{Page, PageQuery, SortDirection, SortSpec};
