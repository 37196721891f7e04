//! Notebook checkout hooks.
//!
//! Both hooks run a small Python program inside the user's lab that copies
//! a notebook from GitHub into `notebooks/on-demand/`. The program never
//! overwrites an existing copy: it picks the first free name, appending
//! `-<serial>`, and prints the serial it used. A serial other than `0`
//! means the redirect must point at the suffixed file.
//!
//! Both hooks expect a running lab; put `ensure_autostart_lab` or
//! `ensure_running_lab` before them.

use crate::template;
use signpost_core::{
    ClientError, Hook, HookError, HookOutcome, IntoHookOutcome, LabClient, Parameters,
};
use tracing::debug;

const GITHUB_PAYLOAD: &str = include_str!("payloads/github_notebook.py");
const SYSTEM_TEST_PAYLOAD: &str = include_str!("payloads/system_test.py");
const SOURCE_MARKER: &str = "__SIGNPOST_SOURCE__";
const GITHUB_HOST: &str = "github.com";

/// GitHub organizations [`GithubNotebook`] will fetch from by default.
pub const ALLOWED_OWNERS: &[&str] = &["lsst", "lsst-dm", "lsst-sqre", "lsst-ts", "rubin-dp0"];

fn payload(program: &str, source: &str) -> Result<String, HookError> {
    let literal = serde_json::to_string(source).map_err(|e| HookError::Custom(e.into()))?;
    Ok(program.replace(SOURCE_MARKER, &literal))
}

async fn checkout(client: &dyn LabClient, code: &str) -> Result<Option<String>, HookError> {
    client.auth_to_hub().await?;
    client.auth_to_lab().await?;
    let output = client.run_python(code).await?;
    let serial = output.trim();
    if serial.is_empty() || !serial.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ClientError::Execution(format!("unexpected checkout output {output:?}")).into());
    }
    debug!(serial, "notebook checked out");
    let nonzero = !serial.trim_start_matches('0').is_empty();
    Ok(nonzero.then(|| serial.to_string()))
}

/// Where a GitHub notebook lives, parsed from the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubSource {
    /// Owning organization or user.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// File path inside the repository, without `.ipynb`.
    pub file: String,
    /// Branch or tag, if one was given after `@`.
    pub branch: Option<String>,
}

impl GithubSource {
    /// Parse `[github.com/]<owner>/<repo>/<file>[.ipynb][@branch]`.
    pub fn parse(path: &str) -> Result<Self, HookError> {
        let invalid = |reason: &str| HookError::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = path.trim_matches('/');
        let trimmed = trimmed
            .strip_prefix(GITHUB_HOST)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(trimmed);

        let (location, branch) = match trimmed.split_once('@') {
            Some((_, b)) if b.contains('@') => return Err(invalid("more than one `@`")),
            Some((_, "")) => return Err(invalid("empty branch after `@`")),
            Some((loc, b)) => (loc, Some(b.to_string())),
            None => (trimmed, None),
        };

        let mut parts = location.splitn(3, '/');
        let (Some(owner), Some(repo), Some(file)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected owner/repo/file"));
        };
        let file = file.strip_suffix(".ipynb").unwrap_or(file);
        if owner.is_empty() || repo.is_empty() || file.is_empty() {
            return Err(invalid("expected owner/repo/file"));
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            file: file.to_string(),
            branch,
        })
    }

    /// `github.com/<owner>/<repo>/<file>[@branch]`, as handed to the lab.
    pub fn checkout_spec(&self) -> String {
        let mut spec = format!("{GITHUB_HOST}/{}/{}/{}", self.owner, self.repo, self.file);
        if let Some(branch) = &self.branch {
            spec.push('@');
            spec.push_str(branch);
        }
        spec
    }

    /// Target template for the checked-out copy.
    pub fn target(&self, serial: Option<&str>) -> String {
        let mut name = format!("{}/{}/{}", self.owner, self.repo, self.file);
        if let Some(serial) = serial {
            name.push('-');
            name.push_str(serial);
        }
        format!(
            "${{base_url}}/nb/user/${{user}}/lab/tree/notebooks/on-demand/{GITHUB_HOST}/{}.ipynb",
            template::escape(&name)
        )
    }
}

/// Copies a notebook from an allow-listed GitHub organization and redirects
/// to the copy.
///
/// The request path names the notebook as `<owner>/<repo>/<file>[@branch]`,
/// optionally prefixed with `github.com/`. The target is always rewritten.
#[derive(Debug, Clone)]
pub struct GithubNotebook {
    allowed_owners: Vec<String>,
}

impl Default for GithubNotebook {
    fn default() -> Self {
        Self::new()
    }
}

impl GithubNotebook {
    /// Allow [`ALLOWED_OWNERS`].
    pub fn new() -> Self {
        Self::with_owners(ALLOWED_OWNERS.iter().copied())
    }

    /// Allow only `owners`.
    pub fn with_owners<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_owners: owners.into_iter().map(Into::into).collect(),
        }
    }

    async fn run(&self, params: &Parameters) -> Result<Parameters, HookError> {
        let source = GithubSource::parse(&params.path)?;
        if !self.allowed_owners.iter().any(|o| *o == source.owner) {
            return Err(HookError::InvalidPath {
                path: params.path.clone(),
                reason: format!("owner `{}` is not allowed", source.owner),
            });
        }

        debug!(user = %params.user, source = %source.checkout_spec(), "checking out GitHub notebook");
        let code = payload(GITHUB_PAYLOAD, &source.checkout_spec())?;
        let serial = checkout(params.client.as_ref(), &code).await?;

        let target = source.target(serial.as_deref());
        debug!(new_target = %target, "continuing to redirect");
        Ok(params.clone().with_target(target).with_unique_id(serial))
    }
}

impl Hook for GithubNotebook {
    async fn apply(&self, params: &Parameters) -> HookOutcome {
        self.run(params).await.into_outcome()
    }
}

/// Copies a notebook from the system test repository.
///
/// The request path is the notebook's path in the repository, without
/// `.ipynb`. When the copy had to be suffixed, the last component of the
/// target is rewritten to `${path}-${unique_id}.ipynb`; otherwise the
/// context is unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTest;

impl SystemTest {
    async fn run(&self, params: &Parameters) -> Result<Option<Parameters>, HookError> {
        let source = params.path.trim_matches('/');
        let source = source.strip_suffix(".ipynb").unwrap_or(source);
        if source.is_empty() {
            return Err(HookError::InvalidPath {
                path: params.path.clone(),
                reason: "no notebook named".to_string(),
            });
        }

        debug!(user = %params.user, source, "checking out system test notebook");
        let code = payload(SYSTEM_TEST_PAYLOAD, source)?;
        let Some(serial) = checkout(params.client.as_ref(), &code).await? else {
            debug!("continuing to redirect; parameters unchanged");
            return Ok(None);
        };

        let target = match params.target.rsplit_once('/') {
            Some((head, _)) => format!("{head}/${{path}}-${{unique_id}}.ipynb"),
            None => "${path}-${unique_id}.ipynb".to_string(),
        };
        debug!(new_target = %target, unique_id = %serial, "continuing to redirect");
        Ok(Some(
            params.clone().with_target(target).with_unique_id(Some(serial)),
        ))
    }
}

impl Hook for SystemTest {
    async fn apply(&self, params: &Parameters) -> HookOutcome {
        self.run(params).await.into_outcome()
    }
}
