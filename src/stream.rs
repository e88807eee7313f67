//! A lazily materialized, append-only stream with independent cursors.
//!
//! The module universe is not known in advance: resolving one module can
//! reveal others, which in turn reveal libraries, and so on. A [`LazyStream`]
//! models that universe as a backing list that grows one discovery step at a
//! time. Each consumer holds its own [`Cursor`]; pulling from a position that
//! has already been materialized replays it, and pulling past the end asks a
//! [`Discover`] implementation for one more step.

/// Produces the elements of a [`LazyStream`], one step at a time.
pub trait Discover<T> {
    type Error;

    /// Performs a single discovery step, appending whatever it finds to
    /// `out`. A step may append nothing. Returns `false` once there is
    /// nothing left to discover.
    fn discover(&mut self, out: &mut Vec<T>) -> Result<bool, Self::Error>;
}

/// A position in a [`LazyStream`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    position: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(self) -> usize {
        self.position
    }
}

#[derive(Debug, Clone)]
pub struct LazyStream<T> {
    items: Vec<T>,
    exhausted: bool,
}

impl<T> Default for LazyStream<T> {
    fn default() -> Self {
        LazyStream {
            items: Vec::new(),
            exhausted: false,
        }
    }
}

impl<T: Copy> LazyStream<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stream whose first elements are already materialized.
    pub fn with_items(items: Vec<T>) -> Self {
        LazyStream {
            items,
            exhausted: false,
        }
    }

    /// The elements discovered so far, in discovery order.
    pub fn materialized(&self) -> &[T] {
        &self.items
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Marks the stream as having more to discover, after new work has been
    /// queued for an exhausted discoverer.
    pub fn reopen(&mut self) {
        self.exhausted = false;
    }

    /// Returns the element at `cursor` and advances it, discovering as many
    /// steps as necessary. Returns `None` once discovery is exhausted and the
    /// cursor has reached the end of the backing list.
    pub fn next<D: Discover<T>>(
        &mut self,
        cursor: &mut Cursor,
        discover: &mut D,
    ) -> Result<Option<T>, D::Error> {
        while cursor.position >= self.items.len() {
            if self.exhausted {
                return Ok(None);
            }

            if !discover.discover(&mut self.items)? {
                self.exhausted = true;
            }
        }

        let item = self.items[cursor.position];
        cursor.position += 1;
        Ok(Some(item))
    }

    /// Advances `cursor` until `predicate` holds for an element, and returns
    /// that element. The cursor is parked just past it, so the next search
    /// resumes where this one stopped.
    pub fn resume_until<D, F>(
        &mut self,
        cursor: &mut Cursor,
        discover: &mut D,
        mut predicate: F,
    ) -> Result<Option<T>, D::Error>
    where
        D: Discover<T>,
        F: FnMut(T, &D) -> bool,
    {
        while let Some(item) = self.next(cursor, discover)? {
            if predicate(item, discover) {
                return Ok(Some(item));
            }
        }

        Ok(None)
    }

    /// Discovers everything that is left and returns the whole backing list.
    pub fn drain<D: Discover<T>>(
        &mut self,
        discover: &mut D,
    ) -> Result<&[T], D::Error> {
        while !self.exhausted {
            if !discover.discover(&mut self.items)? {
                self.exhausted = true;
            }
        }

        Ok(&self.items)
    }
}
