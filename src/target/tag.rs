//! Runtime platforms and the hierarchical tags that restrict them.
//!
//! Tags are grouped into disjoint [`TagPartition`]s. Within a partition the
//! tags form a forest through their `parent` links, and the depth of a tag is
//! its distance from the root of its tree. A tag may additionally *imply* tags
//! from other partitions (e.g. `javafx` implies the `jre` runtime), and the
//! platform restrictions of a tag are intersected down its parent chain and
//! across everything it implies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A runtime that an executable module is ultimately built for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Jre,
    Gwt,
    J2cl,
    Teavm,
}

impl Platform {
    pub const ALL: [Platform; 4] =
        [Platform::Jre, Platform::Gwt, Platform::J2cl, Platform::Teavm];

    pub fn token(self) -> &'static str {
        match self {
            Platform::Jre => "jre",
            Platform::Gwt => "gwt",
            Platform::J2cl => "j2cl",
            Platform::Teavm => "teavm",
        }
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A set of [`Platform`] values.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformSet(u8);

impl PlatformSet {
    pub const EMPTY: PlatformSet = PlatformSet(0);
    pub const ALL: PlatformSet = PlatformSet::of(&Platform::ALL);
    pub const WEB: PlatformSet =
        PlatformSet::of(&[Platform::Gwt, Platform::J2cl, Platform::Teavm]);

    pub const fn of(platforms: &[Platform]) -> PlatformSet {
        let mut bits = 0;
        let mut i = 0;

        while i < platforms.len() {
            bits |= platforms[i].bit();
            i += 1;
        }

        PlatformSet(bits)
    }

    pub fn contains(self, platform: Platform) -> bool {
        self.0 & platform.bit() != 0
    }

    pub fn intersection(self, other: PlatformSet) -> PlatformSet {
        PlatformSet(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Platform> {
        Platform::ALL.into_iter().filter(move |p| self.contains(*p))
    }
}

impl Default for PlatformSet {
    fn default() -> Self {
        PlatformSet::ALL
    }
}

impl fmt::Debug for PlatformSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// One of the disjoint tag hierarchies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagPartition {
    Platform,
    Architecture,
    Viewer,
    WebTechnology,
}

impl TagPartition {
    pub const COUNT: usize = 4;

    fn index(self) -> usize {
        self as usize
    }
}

/// The deepest tag held or implied by some tag, for each partition.
pub type PartitionMembers = [Option<TargetTag>; TagPartition::COUNT];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TargetTag {
    Java,
    Jre,
    Web,
    Gwt,
    J2cl,
    Teavm,
    Server,
    Vertx,
    Client,
    Javafx,
    Openjfx,
    Gluon,
    Html,
    Elemental2,
    Jsinterop,
}

struct TagInfo {
    token: &'static str,
    partition: TagPartition,
    parent: Option<TargetTag>,
    platforms: PlatformSet,
    implies: &'static [TargetTag],
}

const JRE_ONLY: PlatformSet = PlatformSet::of(&[Platform::Jre]);
const GWT_ONLY: PlatformSet = PlatformSet::of(&[Platform::Gwt]);
const J2CL_ONLY: PlatformSet = PlatformSet::of(&[Platform::J2cl]);
const TEAVM_ONLY: PlatformSet = PlatformSet::of(&[Platform::Teavm]);
const GWT_J2CL: PlatformSet = PlatformSet::of(&[Platform::Gwt, Platform::J2cl]);

const fn tag(
    token: &'static str,
    partition: TagPartition,
    parent: Option<TargetTag>,
    platforms: PlatformSet,
    implies: &'static [TargetTag],
) -> TagInfo {
    TagInfo {
        token,
        partition,
        parent,
        platforms,
        implies,
    }
}

impl TargetTag {
    pub const ALL: [TargetTag; 15] = [
        TargetTag::Java,
        TargetTag::Jre,
        TargetTag::Web,
        TargetTag::Gwt,
        TargetTag::J2cl,
        TargetTag::Teavm,
        TargetTag::Server,
        TargetTag::Vertx,
        TargetTag::Client,
        TargetTag::Javafx,
        TargetTag::Openjfx,
        TargetTag::Gluon,
        TargetTag::Html,
        TargetTag::Elemental2,
        TargetTag::Jsinterop,
    ];

    const fn info(self) -> TagInfo {
        use TagPartition as P;
        use TargetTag as T;

        match self {
            T::Java => tag("java", P::Platform, None, PlatformSet::ALL, &[]),
            T::Jre => tag("jre", P::Platform, Some(T::Java), JRE_ONLY, &[]),
            T::Web => {
                tag("web", P::Platform, Some(T::Java), PlatformSet::WEB, &[])
            }
            T::Gwt => tag("gwt", P::Platform, Some(T::Web), GWT_ONLY, &[]),
            T::J2cl => tag("j2cl", P::Platform, Some(T::Web), J2CL_ONLY, &[]),
            T::Teavm => {
                tag("teavm", P::Platform, Some(T::Web), TEAVM_ONLY, &[])
            }
            T::Server => {
                tag("server", P::Architecture, None, PlatformSet::ALL, &[])
            }
            T::Vertx => tag(
                "vertx",
                P::Architecture,
                Some(T::Server),
                JRE_ONLY,
                &[T::Jre],
            ),
            T::Client => {
                tag("client", P::Architecture, None, PlatformSet::ALL, &[])
            }
            T::Javafx => {
                tag("javafx", P::Viewer, None, JRE_ONLY, &[T::Jre, T::Client])
            }
            T::Openjfx => {
                tag("openjfx", P::Viewer, Some(T::Javafx), JRE_ONLY, &[])
            }
            T::Gluon => {
                tag("gluon", P::Viewer, Some(T::Openjfx), JRE_ONLY, &[])
            }
            T::Html => tag(
                "html",
                P::Viewer,
                None,
                PlatformSet::WEB,
                &[T::Web, T::Client],
            ),
            T::Elemental2 => {
                tag("elemental2", P::WebTechnology, None, GWT_J2CL, &[T::Web])
            }
            T::Jsinterop => {
                tag("jsinterop", P::WebTechnology, None, GWT_J2CL, &[T::Web])
            }
        }
    }

    pub fn token(self) -> &'static str {
        self.info().token
    }

    pub fn from_token(token: &str) -> Option<TargetTag> {
        TargetTag::ALL.into_iter().find(|tag| tag.token() == token)
    }

    pub fn partition(self) -> TagPartition {
        self.info().partition
    }

    pub fn parent(self) -> Option<TargetTag> {
        self.info().parent
    }

    /// The distance from this tag to the root of its partition tree.
    pub fn depth(self) -> usize {
        self.ancestors().count()
    }

    /// The strict ancestors of this tag, nearest first.
    pub fn ancestors(self) -> impl Iterator<Item = TargetTag> {
        std::iter::successors(self.parent(), |tag| tag.parent())
    }

    /// Returns `true` if `self` lies on the path from the root of its
    /// partition down to `other` (inclusive).
    pub fn is_ancestor_or_self(self, other: TargetTag) -> bool {
        self == other || other.ancestors().any(|tag| tag == self)
    }

    /// Every tag implied by `self`, directly or through its ancestors,
    /// closed transitively. The result never contains `self`.
    pub fn implied_tags(self) -> Vec<TargetTag> {
        let mut implied = Vec::new();
        let mut stack = Vec::new();

        stack.extend(self.direct_implications());

        while let Some(tag) = stack.pop() {
            if tag == self || implied.contains(&tag) {
                continue;
            }

            implied.push(tag);
            stack.extend(tag.direct_implications());
        }

        implied
    }

    fn direct_implications(self) -> impl Iterator<Item = TargetTag> {
        std::iter::once(self)
            .chain(self.ancestors())
            .flat_map(|tag| tag.info().implies.iter().copied())
    }

    /// The platforms this tag can run on once its parent chain and its
    /// implications are taken into account.
    pub fn supported_platforms(self) -> PlatformSet {
        let own = std::iter::once(self)
            .chain(self.ancestors())
            .fold(PlatformSet::ALL, |set, tag| {
                set.intersection(tag.info().platforms)
            });

        self.implied_tags().into_iter().fold(own, |set, tag| {
            std::iter::once(tag)
                .chain(tag.ancestors())
                .fold(set, |set, tag| set.intersection(tag.info().platforms))
        })
    }

    pub fn supports(self, platform: Platform) -> bool {
        self.supported_platforms().contains(platform)
    }

    /// For each partition, the deepest tag among `self` and everything it
    /// implies.
    pub fn deepest_members(self) -> PartitionMembers {
        let mut members: PartitionMembers = [None; TagPartition::COUNT];

        for tag in std::iter::once(self).chain(self.implied_tags()) {
            let slot = &mut members[tag.partition().index()];

            match slot {
                Some(current) if current.depth() >= tag.depth() => (),
                _ => *slot = Some(tag),
            }
        }

        members
    }

    /// Grades how well a candidate tag `self` serves a `requested` tag.
    ///
    /// Returns `-1` when the two are incompatible, and otherwise a
    /// non-negative grade that grows with the depth at which the two tags
    /// agree in each shared partition.
    pub fn grade_compatibility(self, requested: TargetTag) -> i32 {
        if self
            .supported_platforms()
            .intersection(requested.supported_platforms())
            .is_empty()
        {
            return -1;
        }

        if self.partition() == requested.partition()
            && self.depth() > requested.depth()
        {
            return -1;
        }

        let candidate_members = self.deepest_members();
        let requested_members = requested.deepest_members();
        let mut grade = 0;

        for (candidate, requested) in
            candidate_members.into_iter().zip(requested_members)
        {
            if let (Some(candidate), Some(requested)) = (candidate, requested) {
                // members must sit on one branch, and the candidate may not
                // be more specific than what was asked for
                if !candidate.is_ancestor_or_self(requested) {
                    return -1;
                }

                grade += candidate.depth() as i32 + 1;
            }
        }

        grade
    }
}

impl fmt::Display for TargetTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_through_lookup() {
        for tag in TargetTag::ALL {
            assert_eq!(TargetTag::from_token(tag.token()), Some(tag));
        }

        assert_eq!(TargetTag::from_token("kit"), None);
    }

    #[test]
    fn depths_follow_parent_chains() {
        assert_eq!(TargetTag::Java.depth(), 0);
        assert_eq!(TargetTag::Web.depth(), 1);
        assert_eq!(TargetTag::Gwt.depth(), 2);
        assert_eq!(TargetTag::Gluon.depth(), 2);
        assert_eq!(TargetTag::Client.depth(), 0);
    }

    #[test]
    fn implications_are_transitive() {
        let implied = TargetTag::Gluon.implied_tags();
        assert!(implied.contains(&TargetTag::Jre));
        assert!(implied.contains(&TargetTag::Client));

        let implied = TargetTag::Elemental2.implied_tags();
        assert_eq!(implied, vec![TargetTag::Web]);
    }

    #[test]
    fn platform_sets_are_intersected() {
        assert!(TargetTag::Openjfx.supports(Platform::Jre));
        assert!(!TargetTag::Openjfx.supports(Platform::Gwt));

        let web = TargetTag::Elemental2.supported_platforms();
        assert!(web.contains(Platform::Gwt));
        assert!(web.contains(Platform::J2cl));
        assert!(!web.contains(Platform::Teavm));
    }

    #[test]
    fn deepest_members_span_partitions() {
        let members = TargetTag::Gluon.deepest_members();
        assert_eq!(members[0], Some(TargetTag::Jre));
        assert_eq!(members[1], Some(TargetTag::Client));
        assert_eq!(members[2], Some(TargetTag::Gluon));
        assert_eq!(members[3], None);
    }

    #[test]
    fn grading_rewards_depth_of_agreement() {
        use TargetTag as T;

        assert_eq!(T::Java.grade_compatibility(T::Gwt), 1);
        assert_eq!(T::Web.grade_compatibility(T::Gwt), 2);
        assert_eq!(T::Gwt.grade_compatibility(T::Gwt), 3);
        assert_eq!(T::Html.grade_compatibility(T::Gwt), 2);
    }

    #[test]
    fn grading_rejects_incompatible_tags() {
        use TargetTag as T;

        // disjoint platforms
        assert_eq!(T::Javafx.grade_compatibility(T::Gwt), -1);
        assert_eq!(T::Elemental2.grade_compatibility(T::Teavm), -1);
        // more specific than requested
        assert_eq!(T::Gwt.grade_compatibility(T::Web), -1);
        // sibling branches
        assert_eq!(T::Client.grade_compatibility(T::Server), -1);
    }
}
