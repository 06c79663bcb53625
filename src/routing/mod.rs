//! Resource router: static verb + path-template table resolved to CRUD operations or named actions.

mod matcher;
mod table;
mod template;

pub use matcher::{RouteMatch, RouteTable};
pub use table::{api_resource, api_rules, HttpVerb, ResourceOperation, RouteRule};
pub use template::{split_path, PathTemplate, Segment};
