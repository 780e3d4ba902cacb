use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{MixError, Result};

type Claims = Arc<Mutex<HashSet<PathBuf>>>;

/// RAII guard for one running mix.
///
/// Holds a concurrency slot and the claim on the job's output path; both are
/// released when the guard is dropped.
pub struct MixPermit {
    _slot: OwnedSemaphorePermit,
    output_path: PathBuf,
    claims: Claims,
}

impl MixPermit {
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl std::fmt::Debug for MixPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixPermit")
            .field("output_path", &self.output_path)
            .finish()
    }
}

impl Drop for MixPermit {
    fn drop(&mut self) {
        let mut claims = self.claims.lock().unwrap_or_else(|e| e.into_inner());
        claims.remove(&self.output_path);
    }
}

/// Admission control for mixes.
///
/// A mix loads every source model into memory, so the number of concurrent
/// mixes is bounded by a semaphore.  Two mixes writing the same output path
/// would interleave their writes, so each output path may be claimed by at
/// most one in-flight mix.  Both checks fail immediately instead of queueing.
#[derive(Debug, Clone)]
pub struct MixAdmission {
    slots: Arc<Semaphore>,
    capacity: usize,
    claims: Claims,
}

impl MixAdmission {
    /// Create an admission controller allowing `capacity` concurrent mixes
    /// (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            claims: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of mixes currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    /// Try to admit a mix writing to `output_path`.
    ///
    /// Returns [`MixError::OutputInUse`] if the path is claimed by another
    /// mix, or [`MixError::Busy`] if every slot is taken.
    pub fn try_acquire(&self, output_path: &Path) -> Result<MixPermit> {
        let key = normalize(output_path);
        let mut claims = self.claims.lock().unwrap_or_else(|e| e.into_inner());

        if claims.contains(&key) {
            return Err(MixError::OutputInUse(key));
        }

        let slot = Arc::clone(&self.slots)
            .try_acquire_owned()
            .map_err(|_| MixError::Busy {
                capacity: self.capacity,
            })?;

        claims.insert(key.clone());
        Ok(MixPermit {
            _slot: slot,
            output_path: key,
            claims: Arc::clone(&self.claims),
        })
    }
}

impl Default for MixAdmission {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Claim key for an output path.
///
/// Relative paths are anchored at the working directory and `.`/`..` are
/// resolved lexically, so `out`, `./out` and `x/../out` share one key.
/// Symlinks are not followed; the target may not exist yet.
fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut key = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                key.pop();
            }
            other => key.push(other),
        }
    }
    key
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn permit_acquired_and_released() {
        let admission = MixAdmission::new(2);
        let p1 = admission.try_acquire(Path::new("/out/a")).expect("first permit");
        let p2 = admission.try_acquire(Path::new("/out/b")).expect("second permit");
        assert_eq!(admission.in_flight(), 2);

        let err = admission.try_acquire(Path::new("/out/c")).unwrap_err();
        assert!(matches!(err, MixError::Busy { capacity: 2 }));

        drop(p1);
        let _p3 = admission
            .try_acquire(Path::new("/out/c"))
            .expect("permit after release");
        drop(p2);
        assert_eq!(admission.in_flight(), 1);
    }

    #[test]
    fn same_output_path_is_refused() {
        let admission = MixAdmission::new(4);
        let _held = admission.try_acquire(Path::new("/tmp/out")).unwrap();

        let err = admission.try_acquire(Path::new("/tmp//out/")).unwrap_err();
        assert!(matches!(err, MixError::OutputInUse(ref p) if p == Path::new("/tmp/out")));
        // A refused request must not leak a slot.
        assert_eq!(admission.in_flight(), 1);
    }

    #[test]
    fn relative_and_absolute_spellings_share_a_claim() {
        let admission = MixAdmission::new(4);

        let _rel = admission.try_acquire(Path::new("out")).unwrap();
        let err = admission.try_acquire(Path::new("./out")).unwrap_err();
        assert!(matches!(err, MixError::OutputInUse(_)));
        let cwd = std::env::current_dir().unwrap();
        let err = admission.try_acquire(&cwd.join("out")).unwrap_err();
        assert!(matches!(err, MixError::OutputInUse(_)));

        let _abs = admission.try_acquire(Path::new("/tmp/out")).unwrap();
        let err = admission.try_acquire(Path::new("/tmp/x/../out")).unwrap_err();
        assert!(matches!(err, MixError::OutputInUse(ref p) if p == Path::new("/tmp/out")));
        assert_eq!(admission.in_flight(), 2);
    }

    #[test]
    fn parent_dir_above_root_stays_at_root() {
        assert_eq!(normalize(Path::new("/../../tmp/out")), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn output_path_reusable_after_release() {
        let admission = MixAdmission::default();
        let held = admission.try_acquire(Path::new("/tmp/out")).unwrap();
        assert_eq!(held.output_path(), Path::new("/tmp/out"));
        drop(held);
        assert!(admission.try_acquire(Path::new("/tmp/out")).is_ok());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let admission = MixAdmission::new(0);
        assert_eq!(admission.capacity(), 1);
        assert!(admission.try_acquire(Path::new("/x")).is_ok());
    }

    #[test]
    fn clones_share_state() {
        let admission = MixAdmission::new(1);
        let other = admission.clone();
        let _held = admission.try_acquire(Path::new("/x")).unwrap();
        assert!(matches!(
            other.try_acquire(Path::new("/y")),
            Err(MixError::Busy { .. })
        ));
    }
}
