use std::{ffi::OsStr, path::Path};

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Decides which entries a walk never descends into or yields
#[derive(Debug, Clone)]
pub struct IgnoreRules {
	globs: GlobSet,
	skip_hidden: bool,
}

impl IgnoreRules {
	pub fn new(
		patterns: impl IntoIterator<Item = impl AsRef<str>>,
		skip_hidden: bool,
	) -> Result<Self, globset::Error> {
		let globs = patterns
			.into_iter()
			.map(|s| s.as_ref().parse::<Glob>())
			.collect::<Result<Vec<_>, _>>()?
			.into_iter()
			.fold(&mut GlobSetBuilder::new(), |builder, glob| builder.add(glob))
			.build()?;

		Ok(Self { globs, skip_hidden })
	}

	/// Patterns are matched against the entry name and against its full path, so both
	/// `*.tmp` and `**/cache/**` style rules work.
	pub fn is_ignored(&self, path: &Path, name: &OsStr) -> bool {
		(self.skip_hidden && is_hidden(name))
			|| self.globs.is_match(name)
			|| self.globs.is_match(path)
	}
}

fn is_hidden(name: &OsStr) -> bool {
	name.as_encoded_bytes().first() == Some(&b'.')
}
