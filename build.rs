use std::{fs, path::Path, process::Command, time::SystemTime};

fn main() {
  let now = SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .map(|d| d.as_millis())
    .unwrap_or_default();
  println!("cargo:rustc-env=BUILD_TIME={}", now);

  println!("cargo:rerun-if-changed=.git/HEAD");
  if Path::new(".git/refs/heads").exists() {
    println!("cargo:rerun-if-changed=.git/refs/heads");
  }

  let branch = git(&["rev-parse", "--abbrev-ref", "HEAD"]).or_else(branch_from_head);
  let commit = git(&["rev-parse", "--short=8", "HEAD"]);
  let dirty = git(&["status", "--porcelain"]).map(|s| !s.is_empty()).unwrap_or(false);

  println!(
    "cargo:rustc-env=GIT_BRANCH={}",
    branch.unwrap_or_else(|| "unknown".into())
  );
  println!(
    "cargo:rustc-env=GIT_COMMIT_SHORT={}",
    commit.unwrap_or_else(|| "unknown".into())
  );
  println!("cargo:rustc-env=GIT_DIRTY={}", dirty);
}

fn git(args: &[&str]) -> Option<String> {
  let output = Command::new("git").args(args).output().ok()?;
  if !output.status.success() {
    return None;
  }
  Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn branch_from_head() -> Option<String> {
  let head = fs::read_to_string(".git/HEAD").ok()?;
  let ref_path = head.strip_prefix("ref: ")?.trim();
  ref_path.rsplit('/').next().map(str::to_string)
}
