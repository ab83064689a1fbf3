use super::LocalRepo;
use crate::error::PreconditionError;
use anyhow::{Context, Result};
use git2::{BranchType, DiffFormat, DiffOptions, Oid, Repository};
use std::path::{Path, PathBuf};

/// Local repository backed by libgit2
pub struct GitRepository {
    repo: Repository,
    root: PathBuf,
}

impl GitRepository {
    /// Find the repository containing `path`
    pub fn discover(path: &Path) -> Result<Self, PreconditionError> {
        let repo = Repository::discover(path)
            .map_err(|_| PreconditionError::NotARepository(path.to_path_buf()))?;
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| PreconditionError::NotARepository(path.to_path_buf()))?;
        Ok(Self { repo, root })
    }

    fn resolve_commit(&self, rev: &str) -> Option<Oid> {
        self.repo
            .revparse_single(rev)
            .and_then(|obj| obj.peel_to_commit())
            .map(|commit| commit.id())
            .ok()
    }

    fn has_local_branch(&self, name: &str) -> bool {
        self.repo.find_branch(name, BranchType::Local).is_ok()
    }

    fn has_remote_branch(&self, name: &str) -> bool {
        self.repo
            .find_branch(&format!("origin/{}", name), BranchType::Remote)
            .is_ok()
    }
}

impl LocalRepo for GitRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn current_branch(&self) -> String {
        let Ok(head) = self.repo.head() else {
            return "unknown".to_string();
        };
        if !head.is_branch() {
            return "HEAD".to_string();
        }
        head.shorthand().unwrap_or("unknown").to_string()
    }

    fn branch_exists(&self, name: &str) -> bool {
        self.has_local_branch(name) || self.has_remote_branch(name)
    }

    fn resolve_branch_ref(&self, name: &str) -> Option<String> {
        if self.has_local_branch(name) {
            Some(name.to_string())
        } else if self.has_remote_branch(name) {
            Some(format!("origin/{}", name))
        } else {
            None
        }
    }

    fn rev_parse(&self, rev: &str) -> Option<String> {
        self.resolve_commit(rev).map(|oid| oid.to_string())
    }

    fn merge_base(&self, a: &str, b: &str) -> Option<String> {
        let a = self.resolve_commit(a)?;
        let b = self.resolve_commit(b)?;
        self.repo.merge_base(a, b).ok().map(|oid| oid.to_string())
    }

    fn diff(&self, from: &str, to: &str, folder: &str) -> Result<String> {
        let from_tree = self
            .repo
            .revparse_single(from)
            .and_then(|obj| obj.peel_to_tree())
            .with_context(|| format!("Failed to resolve '{}'", from))?;
        let to_tree = self
            .repo
            .revparse_single(to)
            .and_then(|obj| obj.peel_to_tree())
            .with_context(|| format!("Failed to resolve '{}'", to))?;

        let mut opts = DiffOptions::new();
        let scope = folder.trim_matches('/');
        if !scope.is_empty() && scope != "." {
            opts.pathspec(scope);
        }

        log::debug!("git diff {}..{} -- {}", from, to, folder);
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&from_tree), Some(&to_tree), Some(&mut opts))
            .with_context(|| format!("Failed to diff {}..{}", from, to))?;

        let mut patch = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            let content = String::from_utf8_lossy(line.content());
            match line.origin() {
                origin @ ('+' | '-' | ' ') => {
                    patch.push(origin);
                    patch.push_str(&content);
                }
                _ => patch.push_str(&content),
            }
            true
        })
        .context("Failed to render diff")?;

        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{RepositoryInitOptions, Signature};
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).unwrap();
        (dir, repo)
    }

    fn commit_file(repo: &Repository, path: &str, content: &str, message: &str) -> Oid {
        let workdir = repo.workdir().unwrap();
        let full_path = workdir.join(path);
        fs::create_dir_all(full_path.parent().unwrap()).unwrap();
        fs::write(&full_path, content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("pr-daily-check", "test@example.com").unwrap();

        let parent = repo
            .head()
            .ok()
            .and_then(|head| head.target())
            .and_then(|oid| repo.find_commit(oid).ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    #[test]
    fn test_discover_outside_repository_fails() {
        let dir = TempDir::new().unwrap();

        let result = GitRepository::discover(dir.path());

        assert!(matches!(result, Err(PreconditionError::NotARepository(_))));
    }

    #[test]
    fn test_branch_queries() {
        let (dir, repo) = init_repo();
        let first = commit_file(&repo, "README.md", "hello\n", "init");
        repo.branch("develop", &repo.find_commit(first).unwrap(), false)
            .unwrap();

        let git = GitRepository::discover(dir.path()).unwrap();

        assert_eq!(git.current_branch(), "main");
        assert!(git.branch_exists("develop"));
        assert!(!git.branch_exists("nope"));
        assert_eq!(git.resolve_branch_ref("develop").as_deref(), Some("develop"));
        assert_eq!(git.resolve_branch_ref("nope"), None);
        assert_eq!(git.rev_parse("develop"), Some(first.to_string()));
        assert_eq!(git.rev_parse("no-such-rev"), None);
    }

    #[test]
    fn test_remote_branch_resolves_through_origin() {
        let (dir, repo) = init_repo();
        let first = commit_file(&repo, "README.md", "hello\n", "init");
        repo.reference("refs/remotes/origin/release", first, false, "test remote")
            .unwrap();

        let git = GitRepository::discover(dir.path()).unwrap();

        assert!(git.branch_exists("release"));
        assert_eq!(
            git.resolve_branch_ref("release").as_deref(),
            Some("origin/release")
        );
        assert_eq!(git.rev_parse("origin/release"), Some(first.to_string()));
    }

    #[test]
    fn test_detached_head_reports_head() {
        let (dir, repo) = init_repo();
        let first = commit_file(&repo, "README.md", "hello\n", "init");
        repo.set_head_detached(first).unwrap();

        let git = GitRepository::discover(dir.path()).unwrap();

        assert_eq!(git.current_branch(), "HEAD");
    }

    #[test]
    fn test_merge_base_of_diverged_branches() {
        let (dir, repo) = init_repo();
        let base = commit_file(&repo, "README.md", "hello\n", "init");
        repo.branch("feature", &repo.find_commit(base).unwrap(), false)
            .unwrap();
        commit_file(&repo, "api/main.rs", "fn main() {}\n", "main work");

        let git = GitRepository::discover(dir.path()).unwrap();

        assert_eq!(git.merge_base("main", "feature"), Some(base.to_string()));
        assert_eq!(git.merge_base("main", "missing"), None);
    }

    #[test]
    fn test_diff_is_scoped_to_folder() {
        let (dir, repo) = init_repo();
        let base = commit_file(&repo, "README.md", "hello\n", "init");
        commit_file(&repo, "api/lib.rs", "pub fn api() {}\n", "api");
        commit_file(&repo, "web/app.js", "console.log(1)\n", "web");

        let git = GitRepository::discover(dir.path()).unwrap();
        let base = base.to_string();

        let api = git.diff(&base, "HEAD", "api").unwrap();
        assert!(api.contains("diff --git a/api/lib.rs b/api/lib.rs"));
        assert!(api.contains("+pub fn api() {}"));
        assert!(!api.contains("web/app.js"));

        let all = git.diff(&base, "HEAD", ".").unwrap();
        assert!(all.contains("api/lib.rs"));
        assert!(all.contains("web/app.js"));

        assert!(git.diff("HEAD", "HEAD", ".").unwrap().is_empty());
        assert!(git.diff("missing", "HEAD", ".").is_err());
    }
}
