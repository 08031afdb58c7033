use std::collections::VecDeque;
use std::fmt;

use super::Drawable;

/// Ordered, single-use queue of drawables borrowed from a scene.
///
/// Iterating consumes it front to back, so a drawable handed out once is gone
/// for the rest of the frame.
#[derive(Default)]
pub struct DrawableQueue<'a> {
    items: VecDeque<&'a dyn Drawable>,
}

impl<'a> DrawableQueue<'a> {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, drawable: &'a dyn Drawable) {
        self.items.push_back(drawable);
    }

    /// Removes and returns the front drawable.
    #[inline]
    pub fn pop(&mut self) -> Option<&'a dyn Drawable> {
        self.items.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for DrawableQueue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawableQueue")
            .field("len", &self.items.len())
            .finish()
    }
}

impl<'a> Iterator for DrawableQueue<'a> {
    type Item = &'a dyn Drawable;

    fn next(&mut self) -> Option<Self::Item> {
        self.pop()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.items.len(), Some(self.items.len()))
    }
}

impl<'a> FromIterator<&'a dyn Drawable> for DrawableQueue<'a> {
    fn from_iter<I: IntoIterator<Item = &'a dyn Drawable>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> Extend<&'a dyn Drawable> for DrawableQueue<'a> {
    fn extend<I: IntoIterator<Item = &'a dyn Drawable>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}
