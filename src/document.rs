use tracing::debug;

use crate::{
    config::{MatrixOptions, PageConfig},
    error::{MatrixError, Result},
    matrix::{MatrixText, build_nodes},
    parser::parse,
    symbols::SymbolSource,
    types::Node,
};

/// A named display surface: the content it was authored with and the nodes
/// currently shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    id: String,
    content: String,
    nodes: Vec<Node>,
}

impl Surface {
    pub fn new(id: impl Into<String>, content: impl Into<String>, options: &MatrixOptions) -> Self {
        let content = content.into();
        let nodes = build_nodes(&parse(&content, options.format), options.layout, 0);

        Self {
            id: id.into(),
            content,
            nodes,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn node_mut(&mut self, idx: usize) -> Option<&mut Node> {
        self.nodes.get_mut(idx)
    }

    pub(crate) fn replace_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
    }
}

pub enum Section {
    Static(Surface),
    Animated(MatrixText),
}

impl Section {
    pub fn id(&self) -> &str {
        match self {
            Section::Static(surface) => surface.id(),
            Section::Animated(matrix) => matrix.id(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        match self {
            Section::Static(surface) => surface.nodes(),
            Section::Animated(matrix) => matrix.nodes(),
        }
    }
}

/// Ordered surfaces of a page, some of them driven by animators.
#[derive(Default)]
pub struct Document {
    sections: Vec<Section>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_page(page: &PageConfig) -> Result<Self> {
        let mut document = Self::new();
        for surface in &page.surfaces {
            document.add(Surface::new(
                surface.id.as_str(),
                surface.content.as_str(),
                &page.options,
            ))?;
        }

        Ok(document)
    }

    pub fn add(&mut self, surface: Surface) -> Result<()> {
        if self.position(surface.id()).is_some() {
            return Err(MatrixError::DuplicateSurface(surface.id().to_string()));
        }

        self.sections.push(Section::Static(surface));
        Ok(())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|section| section.id() == id)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[cfg(test)]
    pub fn animator(&self, id: &str) -> Option<&MatrixText> {
        self.sections.iter().find_map(|section| match section {
            Section::Animated(matrix) if matrix.id() == id => Some(matrix),
            _ => None,
        })
    }

    /// Hands the surface `id` over to a new animator.
    pub fn mount(
        &mut self,
        id: &str,
        options: MatrixOptions,
        symbols: Box<dyn SymbolSource>,
        now: u64,
    ) -> Result<()> {
        let pos = self
            .position(id)
            .ok_or_else(|| MatrixError::SurfaceNotFound(id.to_string()))?;

        match self.sections.remove(pos) {
            Section::Static(surface) => {
                debug!(surface = id, "mounting animator");
                let matrix = MatrixText::new(surface, options, symbols, now);
                self.sections.insert(pos, Section::Animated(matrix));
                Ok(())
            }
            animated @ Section::Animated(_) => {
                self.sections.insert(pos, animated);
                Err(MatrixError::SurfaceBusy(id.to_string()))
            }
        }
    }

    fn animators_mut(&mut self) -> impl Iterator<Item = &mut MatrixText> {
        self.sections.iter_mut().filter_map(|section| match section {
            Section::Animated(matrix) => Some(matrix),
            Section::Static(_) => None,
        })
    }

    pub fn tick(&mut self, now: u64) {
        self.animators_mut().for_each(|matrix| matrix.tick(now));
    }

    pub fn start_all(&mut self, now: u64) {
        self.animators_mut().for_each(|matrix| matrix.start(now));
    }

    pub fn stop_all(&mut self, now: u64) {
        self.animators_mut().for_each(|matrix| matrix.stop(now));
    }

    pub fn is_animating(&self) -> bool {
        self.sections
            .iter()
            .any(|section| matches!(section, Section::Animated(matrix) if matrix.is_animating()))
    }
}
