//! Aggregate a GitHub user's merged pull requests to repositories they do not
//! own into one [`Stats`] report.
//!
//! ```no_run
//! # async fn run() -> gh_oss_stats::Result<()> {
//! use gh_oss_stats::{Client, Config, Context};
//!
//! let client = Client::new(Config {
//!     token: std::env::var("GITHUB_TOKEN").ok(),
//!     include_loc: true,
//!     ..Config::default()
//! })?;
//! let stats = client.get_contributions(&Context::background(), "octocat").await?;
//! println!("{} projects", stats.summary.total_projects);
//! # Ok(())
//! # }
//! ```

pub mod age;
pub mod config;
pub mod context;
pub mod contributions;
pub mod error;
pub mod github;
pub mod stats;
pub mod svg;

pub use config::Config;
pub use context::{Canceller, Cancelled, Context};
pub use contributions::Client;
pub use error::{Error, ItemError, PartialResults, Result};
pub use stats::{Contribution, Stats, Summary};
