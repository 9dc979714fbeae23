//! # cloudsite-link
//!
//! Schema-driven client for cloudsite data services.
//!
//! A [`Session`] fetches the site's schema (applications, resources, keys and
//! views), hands out statements bound to a resource, validates every
//! parameter against the declared attributes, executes the statement over
//! HTTP and decodes the answer into typed [`Row`]s.
//!
//! ```rust,no_run
//! use cloudsite_link::{Session, Statement};
//!
//! # async fn example() -> cloudsite_link::Result<()> {
//! let session = Session::builder()
//!     .base_url("https://api.example.com")
//!     .customer_id("0f4b1c52-2d3e-4a5b-9c6d-7e8f9a0b1c2d")
//!     .site_id("1a2b3c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d")
//!     .api_key("secret")
//!     .build()?;
//! session.init().await?;
//!
//! let persons = session.resource("crm", "persons")?;
//! let mut read = persons.get();
//! read.with_param("pk", "A")?.limit(10)?;
//! for row in session.execute(&mut read).await? {
//!     println!("{:?}", row.get_string("firstName")?);
//! }
//!
//! session.close_default().await;
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod error;
pub mod models;
pub mod normalize;
pub mod result;
pub mod schema;
pub mod session;
pub mod statement;
pub mod timeouts;
pub mod transport;

pub use credentials::Credentials;
pub use error::{LinkError, Result};
pub use models::{
    Application, Attribute, AttributeKind, DataType, Resource, SchemaModel, View,
    SYSTEM_COLUMN_NAMES,
};
pub use result::{ColumnMetadata, ResultSet, Row};
pub use session::{Completion, ExecutionHandle, Session, SessionBuilder};
pub use statement::{
    CreateStatement, DeleteStatement, GetStatement, Method, SaveStatement, Statement,
    StatementState,
};
pub use timeouts::{LinkTimeouts, LinkTimeoutsBuilder};
pub use transport::{HttpTransport, Transport, TransportError, TransportRequest, TransportResponse};
