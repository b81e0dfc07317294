//! # Templates
//!
//! A template is recorded content that can be placed on any page as a form
//! XObject, any number of times. It may have several pages (the active one is
//! what gets placed), images it draws directly, and child templates it
//! places itself.
//!
//! Templates are immutable once recorded and shared through `Arc`, so one
//! child can appear under many parents. Serialization flattens the graph
//! into a node table where each distinct template and image occurs once;
//! decoding rebuilds it and re-links shared nodes to the same `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::hex;
use crate::error::{FolioError, Result};
use crate::units::{Point, Rect};

/// An image drawn directly by a template, kept as its original bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateImage {
    /// Resource name, derived from the bytes.
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Template {
    id: String,
    corner: Point,
    size: Rect,
    pages: Vec<Vec<u8>>,
    page: usize,
    images: Vec<Arc<TemplateImage>>,
    children: Vec<Arc<Template>>,
}

impl Template {
    /// Content hash identifying this template.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// XObject resource name the template is drawn with.
    pub fn resource_name(&self) -> String {
        format!("TPL{}", &self.id[..12.min(self.id.len())])
    }

    pub fn corner(&self) -> Point {
        self.corner
    }

    /// Size in points.
    pub fn size(&self) -> Rect {
        self.size
    }

    /// Content of the active page.
    pub fn bytes(&self) -> &[u8] {
        self.pages.get(self.page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pages(&self) -> &[Vec<u8>] {
        &self.pages
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn images(&self) -> &[Arc<TemplateImage>] {
        &self.images
    }

    pub fn children(&self) -> &[Arc<Template>] {
        &self.children
    }

    /// Every template reachable from this one, children before parents,
    /// each listed once.
    pub fn descendants(self: &Arc<Self>) -> Vec<Arc<Template>> {
        let mut seen = HashMap::new();
        let mut out = Vec::new();
        collect_templates(self, &mut seen, &mut out);
        out.pop();
        out
    }

    fn compute_id(
        corner: Point,
        size: Rect,
        pages: &[Vec<u8>],
        images: &[Arc<TemplateImage>],
        children: &[Arc<Template>],
    ) -> String {
        let mut ctx = md5::Context::new();
        ctx.consume(format!("{} {} {} {}", corner.x, corner.y, size.w, size.h));
        for page in pages {
            ctx.consume((page.len() as u64).to_le_bytes());
            ctx.consume(page);
        }
        for image in images {
            ctx.consume(image.name.as_bytes());
        }
        for child in children {
            ctx.consume(child.id.as_bytes());
        }
        format!("{:x}", ctx.compute())
    }

    /// Encode the template and everything it references.
    pub fn serialize(self: &Arc<Self>) -> Result<Vec<u8>> {
        let mut seen = HashMap::new();
        let mut order = Vec::new();
        collect_templates(self, &mut seen, &mut order);

        let mut image_index: HashMap<String, usize> = HashMap::new();
        let mut images = Vec::new();
        let mut nodes = Vec::with_capacity(order.len());
        for tpl in &order {
            let mut image_refs = Vec::with_capacity(tpl.images.len());
            for image in &tpl.images {
                let idx = *image_index.entry(image.name.clone()).or_insert_with(|| {
                    images.push(ImageNode {
                        name: image.name.clone(),
                        data: hex(&image.data),
                    });
                    images.len() - 1
                });
                image_refs.push(idx);
            }
            nodes.push(TemplateNode {
                id: tpl.id.clone(),
                corner: tpl.corner,
                size: tpl.size,
                pages: tpl
                    .pages
                    .iter()
                    .map(|p| String::from_utf8_lossy(p).into_owned())
                    .collect(),
                page: tpl.page,
                images: image_refs,
                children: tpl.children.iter().map(|c| seen[c.id.as_str()]).collect(),
            });
        }

        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            root: nodes.len() - 1,
            templates: nodes,
            images,
        };
        serde_json::to_vec(&envelope).map_err(|e| FolioError::Template(e.to_string()))
    }

    /// Decode a template written by [`Template::serialize`].
    pub fn deserialize(data: &[u8]) -> Result<Arc<Template>> {
        let envelope: Envelope =
            serde_json::from_slice(data).map_err(|e| FolioError::Template(e.to_string()))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(FolioError::Template(format!(
                "unsupported template version {}",
                envelope.version
            )));
        }

        let mut images = Vec::with_capacity(envelope.images.len());
        for node in envelope.images {
            images.push(Arc::new(TemplateImage {
                name: node.name,
                data: unhex(&node.data)?,
            }));
        }

        let mut built: Vec<Arc<Template>> = Vec::with_capacity(envelope.templates.len());
        for (i, node) in envelope.templates.into_iter().enumerate() {
            let children = node
                .children
                .iter()
                .map(|&c| {
                    // children always precede their parents
                    if c < i {
                        Ok(built[c].clone())
                    } else {
                        Err(FolioError::Template(format!("node {} references node {}", i, c)))
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            let tpl_images = node
                .images
                .iter()
                .map(|&m| {
                    images
                        .get(m)
                        .cloned()
                        .ok_or_else(|| FolioError::Template(format!("missing image {}", m)))
                })
                .collect::<Result<Vec<_>>>()?;
            // the stored id is not trusted; it names resources in the output
            let pages: Vec<Vec<u8>> = node.pages.into_iter().map(String::into_bytes).collect();
            let id = Template::compute_id(node.corner, node.size, &pages, &tpl_images, &children);
            if id != node.id {
                debug!(stored = %node.id, computed = %id, "template id recomputed");
            }
            built.push(Arc::new(Template {
                id,
                corner: node.corner,
                size: node.size,
                pages,
                page: node.page,
                images: tpl_images,
                children,
            }));
        }

        built
            .get(envelope.root)
            .cloned()
            .ok_or_else(|| FolioError::Template("missing root template".to_string()))
    }
}

/// Post-order walk recording each template once, keyed by id.
fn collect_templates(
    tpl: &Arc<Template>,
    seen: &mut HashMap<String, usize>,
    out: &mut Vec<Arc<Template>>,
) {
    if seen.contains_key(&tpl.id) {
        return;
    }
    for child in &tpl.children {
        collect_templates(child, seen, out);
    }
    seen.insert(tpl.id.clone(), out.len());
    out.push(tpl.clone());
}

fn unhex(s: &str) -> Result<Vec<u8>> {
    if s.len() % 2 != 0 {
        return Err(FolioError::Template("odd-length image data".to_string()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|e| FolioError::Template(format!("bad image data: {}", e)))
        })
        .collect()
}

const ENVELOPE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    root: usize,
    templates: Vec<TemplateNode>,
    images: Vec<ImageNode>,
}

#[derive(Serialize, Deserialize)]
struct TemplateNode {
    id: String,
    corner: Point,
    size: Rect,
    pages: Vec<String>,
    page: usize,
    images: Vec<usize>,
    children: Vec<usize>,
}

#[derive(Serialize, Deserialize)]
struct ImageNode {
    name: String,
    data: String,
}

/// A template being recorded.
#[derive(Debug)]
pub(crate) struct TemplateBuilder {
    pub corner: Point,
    pub size: Rect,
    pub pages: Vec<crate::pdf::ContentStream>,
    pub page: usize,
    pub images: Vec<Arc<TemplateImage>>,
    pub children: Vec<Arc<Template>>,
    /// Rotations opened on the current page and not yet reset.
    pub rotations: usize,
}

impl TemplateBuilder {
    pub fn new(corner: Point, size: Rect) -> Self {
        Self {
            corner,
            size,
            pages: vec![crate::pdf::ContentStream::new()],
            page: 0,
            images: Vec::new(),
            children: Vec::new(),
            rotations: 0,
        }
    }

    pub fn add_page(&mut self) {
        self.pages.push(crate::pdf::ContentStream::new());
        self.page = self.pages.len() - 1;
        self.rotations = 0;
    }

    pub fn content_mut(&mut self) -> &mut crate::pdf::ContentStream {
        let page = self.page;
        &mut self.pages[page]
    }

    pub fn add_image(&mut self, name: &str, data: &[u8]) {
        if self.images.iter().any(|i| i.name == name) {
            return;
        }
        self.images.push(Arc::new(TemplateImage {
            name: name.to_string(),
            data: data.to_vec(),
        }));
    }

    pub fn add_child(&mut self, child: &Arc<Template>) {
        if self.children.iter().any(|c| c.id == child.id) {
            return;
        }
        self.children.push(child.clone());
    }

    pub fn finish(self) -> Arc<Template> {
        let pages: Vec<Vec<u8>> = self.pages.iter().map(|p| p.as_bytes().to_vec()).collect();
        let id = Template::compute_id(self.corner, self.size, &pages, &self.images, &self.children);
        Arc::new(Template {
            id,
            corner: self.corner,
            size: self.size,
            pages,
            page: self.page,
            images: self.images,
            children: self.children,
        })
    }
}
