//! Expansion of fixtures and invocations into individual runs.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::paths::DirResolver;
use crate::signature::run_signature;

/// Directory name used when a run has neither fixture nor arguments.
pub const EMPTY_SIGNATURE_DIR: &str = "_";

/// One (fixture, arguments) pairing with its resolved locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// Fixture name, or `None` to start from an empty directory.
    pub fixture: Option<String>,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Filesystem-safe name derived from the fixture and arguments.
    pub signature: String,
    /// Fixture tree to copy from, if any.
    pub source: Option<PathBuf>,
    /// Exclusive working directory for this run.
    pub work_dir: PathBuf,
}

/// Pairs every fixture with every invocation, fixtures outermost.
///
/// With no fixtures a single implicit "no fixture" entry is used.
pub fn expand_pairs(
    fixtures: &[String],
    invocations: &[Vec<String>],
) -> Vec<(Option<String>, Vec<String>)> {
    let fixtures: Vec<Option<String>> = if fixtures.is_empty() {
        vec![None]
    } else {
        fixtures.iter().cloned().map(Some).collect()
    };

    fixtures
        .iter()
        .flat_map(|fixture| {
            invocations
                .iter()
                .map(move |args| (fixture.clone(), args.clone()))
        })
        .collect()
}

/// Expands fixtures and invocations into run specs.
pub fn expand(
    fixtures: &[String],
    invocations: &[Vec<String>],
    sources: &DirResolver,
    temps: &DirResolver,
) -> Vec<RunSpec> {
    expand_pairs(fixtures, invocations)
        .into_iter()
        .map(|(fixture, args)| {
            let signature = run_signature(fixture.as_deref(), &args);
            let source = sources.resolve_opt(fixture.as_deref());
            let work_dir = temps.base().join(directory_name(&signature));
            RunSpec {
                fixture,
                args,
                signature,
                source,
                work_dir,
            }
        })
        .collect()
}

/// Maps a signature to a directory name that always stays directly below
/// the temp root.
///
/// The empty signature becomes [`EMPTY_SIGNATURE_DIR`]; `.` and `..` get
/// the same prefix so they name a child rather than the root or its parent.
pub fn directory_name(signature: &str) -> String {
    match signature {
        "" => EMPTY_SIGNATURE_DIR.to_string(),
        "." | ".." => format!("{}{}", EMPTY_SIGNATURE_DIR, signature),
        _ => signature.to_string(),
    }
}

/// Returns each working-directory name shared by more than one run, with
/// its count.
pub fn colliding_signatures(fixtures: &[String], invocations: &[Vec<String>]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::new();
    for (fixture, args) in expand_pairs(fixtures, invocations) {
        let signature = directory_name(&run_signature(fixture.as_deref(), &args));
        let count = counts.entry(signature.clone()).or_insert(0);
        if *count == 0 {
            order.push(signature);
        }
        *count += 1;
    }
    order
        .into_iter()
        .filter_map(|sig| {
            let count = counts[&sig];
            (count > 1).then_some((sig, count))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_fixtures_expands_to_one_empty_run() {
        let specs = expand(
            &[],
            &[args(&["--version"])],
            &DirResolver::new("/src"),
            &DirResolver::new("/tmp/work"),
        );

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].fixture, None);
        assert_eq!(specs[0].source, None);
        assert_eq!(specs[0].signature, "--version");
        assert_eq!(specs[0].work_dir, PathBuf::from("/tmp/work/--version"));
    }

    #[test]
    fn cross_product_gives_distinct_directories() {
        let fixtures = vec!["f1".to_string(), "f2".to_string()];
        let invocations = vec![args(&["x"]), args(&["y"])];

        let specs = expand(
            &fixtures,
            &invocations,
            &DirResolver::new("/src"),
            &DirResolver::new("/work"),
        );

        let sigs: Vec<_> = specs.iter().map(|s| s.signature.as_str()).collect();
        assert_eq!(sigs, ["f1.x", "f1.y", "f2.x", "f2.y"]);
        let mut dirs: Vec<_> = specs.iter().map(|s| s.work_dir.clone()).collect();
        dirs.dedup();
        assert_eq!(dirs.len(), 4);
        assert_eq!(specs[0].source, Some(PathBuf::from("/src/f1")));
    }

    #[test]
    fn bare_invocation_gets_placeholder_directory() {
        let specs = expand(&[], &[vec![]], &DirResolver::new("/src"), &DirResolver::new("/work"));
        assert_eq!(specs[0].signature, "");
        assert_eq!(specs[0].work_dir, PathBuf::from("/work/_"));
    }

    #[test]
    fn dot_signatures_stay_below_temp_root() {
        let temps = DirResolver::new("/work");
        let specs = expand(
            &[],
            &[args(&["."]), args(&[".."]), args(&["..."])],
            &DirResolver::new("/src"),
            &temps,
        );

        let sigs: Vec<_> = specs.iter().map(|s| s.signature.as_str()).collect();
        assert_eq!(sigs, [".", "..", "..."]);
        for spec in &specs {
            assert_eq!(spec.work_dir.parent(), Some(temps.base()));
        }
        assert_eq!(specs[0].work_dir, PathBuf::from("/work/_."));
        assert_eq!(specs[1].work_dir, PathBuf::from("/work/_.."));
        assert_eq!(specs[2].work_dir, PathBuf::from("/work/..."));
    }

    #[test]
    fn directory_name_passes_ordinary_signatures_through() {
        assert_eq!(directory_name("app.build"), "app.build");
        assert_eq!(directory_name(""), "_");
        assert_eq!(directory_name(".."), "_..");
    }

    #[test]
    fn no_invocations_means_no_runs() {
        let specs = expand(
            &["f1".to_string()],
            &[],
            &DirResolver::new("/src"),
            &DirResolver::new("/work"),
        );
        assert!(specs.is_empty());
    }

    #[test]
    fn detects_signature_collisions() {
        let fixtures = vec!["app".to_string(), "app".to_string()];
        let invocations = vec![args(&["a b"]), args(&["a", "b"]), args(&["c"])];

        let collisions = colliding_signatures(&fixtures, &invocations);

        assert_eq!(
            collisions,
            vec![("app.a.b".to_string(), 4), ("app.c".to_string(), 2)]
        );
    }
}
