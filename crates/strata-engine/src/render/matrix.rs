use glam::Mat4;

/// Stack of accumulated transforms.
///
/// Never empty: the bottom entry is the identity and cannot be popped.
/// Pushing `m` stores `top * m`, so a child's transform is expressed in its
/// parent's space.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    stack: Vec<Mat4>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixStack {
    pub fn new() -> Self {
        Self {
            stack: vec![Mat4::IDENTITY],
        }
    }

    #[inline]
    pub fn push(&mut self, m: Mat4) {
        let top = self.top();
        self.stack.push(top * m);
    }

    /// Removes the top entry.
    ///
    /// Panics when only the identity base remains: pushes and pops must
    /// balance.
    #[inline]
    pub fn pop(&mut self) {
        assert!(self.stack.len() > 1, "MatrixStack::pop: unbalanced pop below the identity base");
        self.stack.pop();
    }

    #[inline]
    pub fn top(&self) -> Mat4 {
        // Invariant: never empty.
        self.stack.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    /// Number of entries above the identity base.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }
}
