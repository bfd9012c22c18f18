//! Fresh project directory names of the form `adjective-noun`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Error, Result};

pub const ADJECTIVES: [&str; 10] = [
    "competent",
    "interesting",
    "exciting",
    "solid",
    "powerful",
    "cool",
    "nice",
    "fast",
    "smart",
    "adorable",
];

pub const NOUNS: [&str; 10] = [
    "app",
    "program",
    "solution",
    "project",
    "code",
    "algorithm",
    "thing",
    "computation",
    "script",
    "idea",
];

/// Candidates tried before giving up.
pub const NAME_ATTEMPTS: usize = 5;

/// Source of word indices.
pub trait NameSampler: Send {
    /// An index in `0..len`.
    fn pick(&mut self, len: usize) -> usize;
}

/// Draws indices from the random bits of a fresh UUID v4.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidSampler;

impl NameSampler for UuidSampler {
    fn pick(&mut self, len: usize) -> usize {
        let bits = uuid::Uuid::new_v4().as_u128();
        (bits % len as u128) as usize
    }
}

#[async_trait]
pub trait Existence: Send + Sync {
    async fn exists(&self, path: &Path) -> Result<bool>;
}

/// Checks the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct Filesystem;

#[async_trait]
impl Existence for Filesystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|e| Error::io(format!("failed to check {}", path.display()), e))
    }
}

pub fn project_name(sampler: &mut dyn NameSampler) -> String {
    let adjective = ADJECTIVES[sampler.pick(ADJECTIVES.len())];
    let noun = NOUNS[sampler.pick(NOUNS.len())];
    format!("{adjective}-{noun}")
}

/// Pick an unused `adjective-noun` path under `parent`.
///
/// Tries [`NAME_ATTEMPTS`] candidates, then fails with
/// [`Error::NoFreeNameFound`].
pub async fn random_project_name(
    parent: &Path,
    sampler: &mut dyn NameSampler,
    existence: &dyn Existence,
) -> Result<PathBuf> {
    for attempt in 1..=NAME_ATTEMPTS {
        let candidate = parent.join(project_name(sampler));
        if !existence.exists(&candidate).await? {
            tracing::debug!(attempt, path = %candidate.display(), "Picked project directory");
            return Ok(candidate);
        }
        tracing::debug!(attempt, path = %candidate.display(), "Project name taken");
    }
    Err(Error::NoFreeNameFound {
        attempts: NAME_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Yields the given indices in order, cycling.
    struct FixedSampler {
        picks: Vec<usize>,
        next: usize,
    }

    impl FixedSampler {
        fn new(picks: &[usize]) -> Self {
            Self {
                picks: picks.to_vec(),
                next: 0,
            }
        }
    }

    impl NameSampler for FixedSampler {
        fn pick(&mut self, len: usize) -> usize {
            let pick = self.picks[self.next % self.picks.len()];
            self.next += 1;
            pick % len
        }
    }

    /// Pretends the given names exist under any parent; counts lookups.
    struct Taken {
        names: HashSet<String>,
        checks: Mutex<usize>,
    }

    impl Taken {
        fn all_but(free: &str) -> Self {
            let names = ADJECTIVES
                .iter()
                .flat_map(|a| NOUNS.iter().map(move |n| format!("{a}-{n}")))
                .filter(|name| name != free)
                .collect();
            Self {
                names,
                checks: Mutex::new(0),
            }
        }

        fn checks(&self) -> usize {
            *self.checks.lock().unwrap()
        }
    }

    #[async_trait]
    impl Existence for Taken {
        async fn exists(&self, path: &Path) -> Result<bool> {
            *self.checks.lock().unwrap() += 1;
            let name = path.file_name().unwrap().to_str().unwrap();
            Ok(self.names.contains(name))
        }
    }

    #[test]
    fn name_space_has_one_hundred_distinct_names() {
        let names: HashSet<String> = (0..100)
            .map(|i| project_name(&mut FixedSampler::new(&[i / 10, i % 10])))
            .collect();
        assert_eq!(names.len(), 100);
        assert!(names.contains("competent-app"));
        assert!(names.contains("adorable-idea"));
    }

    #[tokio::test]
    async fn finds_the_last_free_name() {
        let taken = Taken::all_but("smart-script");
        // Four collisions, then (8, 8) = smart-script on the fifth try.
        let mut sampler = FixedSampler::new(&[0, 0, 1, 1, 2, 2, 3, 3, 8, 8]);

        let path = random_project_name(Path::new("/home/u"), &mut sampler, &taken)
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("/home/u/smart-script"));
        assert_eq!(taken.checks(), 5);
    }

    #[tokio::test]
    async fn gives_up_after_five_collisions() {
        let taken = Taken::all_but("smart-script");
        let mut sampler = FixedSampler::new(&[0, 1, 2, 3, 4, 5, 6, 7, 9, 9, 8, 8]);

        let err = random_project_name(Path::new("/home/u"), &mut sampler, &taken)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoFreeNameFound { attempts: 5 }));
        assert_eq!(taken.checks(), NAME_ATTEMPTS);
    }

    #[tokio::test]
    async fn filesystem_existence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("cool-app")).unwrap();
        assert!(Filesystem.exists(&dir.path().join("cool-app")).await.unwrap());
        assert!(!Filesystem.exists(&dir.path().join("nice-app")).await.unwrap());
    }

    #[test]
    fn uuid_sampler_stays_in_range() {
        let mut sampler = UuidSampler;
        for _ in 0..200 {
            assert!(sampler.pick(10) < 10);
        }
    }
}
