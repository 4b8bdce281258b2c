//! Extract `(owner, repo)` from the repository references GitHub hands back.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid repository URL: {0:?}")]
pub struct RepoUrlError(pub String);

/// Parse owner and repository name out of an API URL
/// (`https://api.github.com/repos/{owner}/{repo}`), a web URL
/// (`https://github.com/{owner}/{repo}`) or a bare `{owner}/{repo}` slug.
///
/// Empty segments are ignored, so a trailing slash is tolerated.
pub fn parse_repo_url(repo_url: &str) -> Result<(String, String), RepoUrlError> {
    let trimmed = repo_url.trim();

    let path = match trimmed.split_once("://") {
        Some((_scheme, rest)) => rest.split_once('/').map_or("", |(_host, path)| path),
        None => trimmed,
    };
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["repos", owner, repo] | [owner, repo] => Ok(((*owner).to_string(), (*repo).to_string())),
        _ => Err(RepoUrlError(repo_url.to_string())),
    }
}
