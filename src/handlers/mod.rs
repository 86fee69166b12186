pub mod doc_changes;
pub mod doc_create;
pub mod doc_delete;
pub mod doc_get;
pub mod doc_list;
pub mod doc_search;
pub mod doc_update;
pub mod health;

pub use doc_changes::*;
pub use doc_create::*;
pub use doc_delete::*;
pub use doc_get::*;
pub use doc_list::*;
pub use doc_search::*;
pub use doc_update::*;
pub use health::*;
