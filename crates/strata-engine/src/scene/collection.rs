use std::any::Any;

use crate::coords::Rect;
use crate::gpu::{GpuError, GraphicsContext};
use crate::render::RenderCtx;

use super::visual::{Visual, VisualBase};

/// Ordered group of visuals. Insertion order is paint order, back to front.
pub struct Collection {
    base: VisualBase,
    children: Vec<Box<dyn Visual>>,
    /// `None` when a child may have changed since the last query.
    bounds: Option<Option<Rect>>,
}

impl Collection {
    pub fn new(gfx: &mut GraphicsContext) -> Self {
        let node = gfx.create_node(None, "collection");
        Self {
            base: VisualBase::new(node),
            children: Vec::new(),
            bounds: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Appends `child` on top of the existing children and takes ownership.
    pub fn push(&mut self, gfx: &mut GraphicsContext, child: Box<dyn Visual>) {
        let index = self.children.len();
        self.insert(gfx, index, child);
    }

    /// Inserts `child` at `index` in paint order and takes ownership.
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, gfx: &mut GraphicsContext, index: usize, child: Box<dyn Visual>) {
        assert!(index <= self.children.len(), "Collection::insert: index {index} out of range");
        gfx.inject(self.base.node(), child.base().node());
        self.children.insert(index, child);
        self.bounds = None;
    }

    /// Detaches the child at `index` and hands it back unreleased.
    ///
    /// Panics if `index` is out of range.
    pub fn remove(&mut self, gfx: &mut GraphicsContext, index: usize) -> Box<dyn Visual> {
        let child = self.children.remove(index);
        gfx.reject(self.base.node(), child.base().node(), false);
        self.bounds = None;
        child
    }

    /// Detaches and releases the child at `index`.
    pub fn delete(&mut self, gfx: &mut GraphicsContext, index: usize) {
        let child = self.children.remove(index);
        gfx.reject(self.base.node(), child.base().node(), true);
        self.bounds = None;
    }

    pub fn child(&self, index: usize) -> Option<&dyn Visual> {
        self.children.get(index).map(|c| c.as_ref())
    }

    /// Mutable access to a child. Cached bounds are dropped, since the child
    /// may change its shape or transform.
    pub fn child_mut(&mut self, index: usize) -> Option<&mut dyn Visual> {
        self.bounds = None;
        let child = self.children.get_mut(index)?;
        Some(child.as_mut())
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("base", &self.base)
            .field("children", &self.children.len())
            .finish()
    }
}

impl Visual for Collection {
    fn base(&self) -> &VisualBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut VisualBase {
        &mut self.base
    }

    fn bounds(&mut self) -> Option<Rect> {
        if let Some(cached) = self.bounds {
            return cached;
        }
        let merged = self
            .children
            .iter_mut()
            .filter_map(|c| {
                let transform = c.base().transform();
                c.bounds().map(|b| b.transformed(&transform))
            })
            .reduce(Rect::union);
        self.bounds = Some(merged);
        merged
    }

    fn overhang(&self) -> f32 {
        self.children.iter().map(|c| c.overhang()).fold(0.0, f32::max)
    }

    fn render_content(&mut self, ctx: &mut RenderCtx<'_>) -> Result<(), GpuError> {
        ctx.push_matrix(self.base.transform());
        let drawn = self.children.iter_mut().try_for_each(|c| c.render_this(ctx));
        ctx.pop_matrix();
        drawn
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
