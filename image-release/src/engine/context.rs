use std::{
    fs, io,
    path::{Path, PathBuf},
};

use glob::{MatchOptions, Pattern};
use log::{debug, warn};

const LARGE_CONTEXT: usize = 500 * 1024 * 1024;
const IGNORE_FILE: &str = ".dockerignore";

/// The engine needs these even when `.dockerignore` excludes them.
const ALWAYS_SENT: [&str; 2] = ["Dockerfile", IGNORE_FILE];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

struct Rule {
    pattern: Pattern,
    /// `!pattern`, re-includes what an earlier rule excluded.
    negated: bool,
}

impl Rule {
    /// A rule matching a directory also matches everything below it.
    fn matches(&self, path: &Path) -> bool {
        path.ancestors()
            .filter(|path| !path.as_os_str().is_empty())
            .any(|path| self.pattern.matches_path_with(path, MATCH_OPTIONS))
    }
}

/// The exclusion rules of a `.dockerignore` file. The last matching rule wins.
#[derive(Default)]
struct Ignore {
    rules: Vec<Rule>,
}

impl Ignore {
    fn read(context: &Path) -> io::Result<Self> {
        match fs::read_to_string(context.join(IGNORE_FILE)) {
            Ok(contents) => Ok(Ignore::parse(&contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Ignore::default()),
            Err(error) => Err(error),
        }
    }

    fn parse(contents: &str) -> Self {
        let rules = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let (negated, line) = match line.strip_prefix('!') {
                    Some(line) => (true, line.trim()),
                    None => (false, line),
                };
                let line = line.trim_start_matches('/').trim_end_matches('/');
                let line = line.strip_prefix("./").unwrap_or(line);
                Pattern::new(line)
                    .inspect_err(|error| warn!("Ignoring {IGNORE_FILE} pattern `{line}`: {error}"))
                    .ok()
                    .map(|pattern| Rule { pattern, negated })
            })
            .collect();
        Ignore { rules }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if ALWAYS_SENT.iter().any(|name| path == Path::new(name)) {
            return false;
        }
        self.rules
            .iter()
            .filter(|rule| rule.matches(path))
            .last()
            .is_some_and(|rule| !rule.negated)
    }

    /// Without negations nothing below an excluded directory can be included again.
    fn can_skip_subtree(&self) -> bool {
        !self.rules.iter().any(|rule| rule.negated)
    }
}

/// Archives the build context directory as an uncompressed tar stream, with paths relative to the
/// directory. Paths excluded by the context's `.dockerignore` are left out.
pub fn archive(path: &Path) -> io::Result<Vec<u8>> {
    debug!("archiving build context {}", path.display());

    let ignore = Ignore::read(path)?;
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    append_dir(&mut builder, &ignore, path, Path::new(""))?;
    let archive = builder.into_inner()?;

    debug!("build context is {} bytes", archive.len());
    if archive.len() > LARGE_CONTEXT {
        warn!(
            "The build context is {} MiB, consider excluding files that are not needed to build the image in {IGNORE_FILE}.",
            archive.len() / 1024 / 1024
        );
    }

    Ok(archive)
}

fn append_dir(
    builder: &mut tar::Builder<Vec<u8>>,
    ignore: &Ignore,
    root: &Path,
    relative: &Path,
) -> io::Result<()> {
    let mut names: Vec<PathBuf> = fs::read_dir(root.join(relative))?
        .map(|entry| entry.map(|entry| relative.join(entry.file_name())))
        .collect::<io::Result<_>>()?;
    names.sort();

    for name in names {
        let path = root.join(&name);
        let excluded = ignore.is_excluded(&name);
        if fs::symlink_metadata(&path)?.is_dir() {
            if excluded && ignore.can_skip_subtree() {
                debug!("excluding {}", name.display());
                continue;
            }
            if !excluded {
                builder.append_dir(&name, &path)?;
            }
            append_dir(builder, ignore, root, &name)?;
        } else if excluded {
            debug!("excluding {}", name.display());
        } else {
            builder.append_path_with_name(&path, &name)?;
        }
    }

    Ok(())
}
