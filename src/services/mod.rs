pub mod catalog_service;
pub use catalog_service::{
    CatalogError, CatalogStore, ChildKind, ChildOutcome, ChildStatus, CreateReport,
    LinkBatchReport,
};

pub mod local_catalog;
pub use local_catalog::LocalCatalog;

pub mod remote_catalog;
pub use remote_catalog::RemoteCatalog;

pub mod sample_data;

pub mod session;
pub use session::SessionStore;

pub mod auth_service;
pub use auth_service::{AuthError, AuthService, SignUpOutcome};

pub mod auth_local;
pub use auth_local::LocalAuth;

pub mod auth_remote;
pub use auth_remote::RemoteAuth;
