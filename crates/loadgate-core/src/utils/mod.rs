//! Small request-shaping helpers shared by the proxy route.

pub mod forwarding;
