pub mod osrm_client;

pub use osrm_client::{build_match_url, save_response, tracepoints, MatchError, OsrmClient, OsrmConfig};
