//! Module targets and target compatibility grading.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use tag::{
    PartitionMembers, Platform, PlatformSet, TagPartition, TargetTag,
};

pub mod tag;

/// The separator between the tokens of a module name.
pub const TOKEN_SEPARATOR: char = '-';

/// The immutable set of [`TargetTag`]s attached to a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Target {
    tags: Box<[TargetTag]>,
}

impl Target {
    pub fn new(tags: impl IntoIterator<Item = TargetTag>) -> Self {
        let mut buf = Vec::new();

        for tag in tags {
            if !buf.contains(&tag) {
                buf.push(tag);
            }
        }

        Target {
            tags: buf.into_boxed_slice(),
        }
    }

    /// Derives the target of a module from the tag tokens in its name.
    ///
    /// The first token names the module itself and is always skipped, and
    /// tokens that aren't tags are ignored; so `kit-css-web` yields `[web]`.
    pub fn from_module_name(name: &str) -> Self {
        Target::new(
            name.split(TOKEN_SEPARATOR)
                .skip(1)
                .filter_map(TargetTag::from_token),
        )
    }

    /// Parses a target written as a hyphen-separated list of tag tokens.
    ///
    /// Returns `None` if any token is not a known tag.
    pub fn parse(tokens: &str) -> Option<Self> {
        tokens
            .split(TOKEN_SEPARATOR)
            .map(TargetTag::from_token)
            .collect::<Option<Vec<_>>>()
            .map(Target::new)
    }

    pub fn tags(&self) -> &[TargetTag] {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn has_tag(&self, tag: TargetTag) -> bool {
        self.tags.contains(&tag)
    }

    /// The platform-partition tags held directly or implied by this target.
    fn platform_tags(&self) -> impl Iterator<Item = TargetTag> + use<'_> {
        self.tags
            .iter()
            .flat_map(|&tag| std::iter::once(tag).chain(tag.implied_tags()))
            .filter(|tag| tag.partition() == TagPartition::Platform)
    }

    /// Returns `true` if `platform` is allowed by every platform tag that
    /// this target holds or implies. Targets without platform tags support
    /// every platform.
    pub fn is_platform_supported(&self, platform: Platform) -> bool {
        self.platform_tags().all(|tag| tag.supports(platform))
    }

    pub fn supported_platforms(&self) -> PlatformSet {
        self.platform_tags().fold(PlatformSet::ALL, |set, tag| {
            set.intersection(tag.supported_platforms())
        })
    }

    /// Grades how well `self`, as a candidate, serves a `requested` target.
    ///
    /// The grade is the sum of the per-tag grades of every (requested,
    /// candidate) pair of tags. Any incompatible pair makes the whole match
    /// incompatible and yields `-1`, unless the candidate directly holds the
    /// requested tag in question.
    pub fn grade_target_match(&self, requested: &Target) -> i32 {
        let mut grade = 0;

        for &requested_tag in requested.tags() {
            for &candidate_tag in self.tags() {
                match candidate_tag.grade_compatibility(requested_tag) {
                    -1 if self.has_tag(requested_tag) => (),
                    -1 => return -1,
                    tag_grade => grade += tag_grade,
                }
            }
        }

        grade
    }

    pub fn is_compatible_with(&self, requested: &Target) -> bool {
        self.grade_target_match(requested) >= 0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tags.split_first() {
            None => f.write_str("<any>"),
            Some((first, rest)) => {
                write!(f, "{first}")?;

                for tag in rest {
                    write!(f, "{TOKEN_SEPARATOR}{tag}")?;
                }

                Ok(())
            }
        }
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let tokens = String::deserialize(deserializer)?;
        Target::parse(&tokens).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown target `{tokens}`"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(tokens: &str) -> Target {
        Target::parse(tokens).unwrap()
    }

    #[test]
    fn module_names_are_tokenized() {
        let t = Target::from_module_name("kit-css-web");
        assert_eq!(t.tags(), &[TargetTag::Web]);

        let t = Target::from_module_name("app-openjfx-gluon");
        assert_eq!(t.tags(), &[TargetTag::Openjfx, TargetTag::Gluon]);

        // the first token is never a tag
        assert!(Target::from_module_name("gwt").is_empty());
    }

    #[test]
    fn parse_rejects_unknown_tokens() {
        assert!(Target::parse("gwt-kit").is_none());
        assert_eq!(target("gwt-elemental2").tags().len(), 2);
    }

    #[test]
    fn platform_support() {
        assert!(Target::default().is_platform_supported(Platform::Teavm));
        assert!(target("gwt").is_platform_supported(Platform::Gwt));
        assert!(!target("gwt").is_platform_supported(Platform::Jre));
        assert!(target("javafx").is_platform_supported(Platform::Jre));
        assert!(!target("javafx").is_platform_supported(Platform::J2cl));
        // tags outside the platform partition impose nothing by themselves
        assert!(target("client").is_platform_supported(Platform::Teavm));
    }

    #[test]
    fn disjoint_platforms_grade_minus_one() {
        assert_eq!(target("javafx").grade_target_match(&target("gwt")), -1);
        assert_eq!(target("gwt").grade_target_match(&target("jre")), -1);
    }

    #[test]
    fn untagged_candidates_are_neutral() {
        assert_eq!(Target::default().grade_target_match(&target("gwt")), 0);
        assert_eq!(target("web").grade_target_match(&Target::default()), 0);
    }

    #[test]
    fn deeper_matches_grade_higher() {
        let requested = target("gwt");
        let web = target("web").grade_target_match(&requested);
        let gwt = target("gwt").grade_target_match(&requested);
        let java = target("java").grade_target_match(&requested);

        assert!(java < web);
        assert!(web < gwt);
    }

    #[test]
    fn direct_holder_explains_away_conflicts() {
        // the candidate holds `gwt` itself, so its incompatible `teavm` tag
        // does not disqualify it
        let candidate = target("gwt-teavm");
        assert!(candidate.grade_target_match(&target("gwt")) >= 0);
    }
}
