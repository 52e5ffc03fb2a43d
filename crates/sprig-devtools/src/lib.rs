//! Debugging aids for sprig: host-tree markup dumps and per-pass render
//! metrics.

use std::fmt::Write;

use anyhow::Context;
use web_time::Instant;

use sprig_core::prelude::*;

/// Serializes `node` and its subtree as HTML-like markup. Attributes are
/// written in insertion order; inline styles follow as one `style` attribute.
pub fn to_markup(doc: &Document, node: HostId) -> String {
    let mut out = String::new();
    write_markup(doc, node, &mut out);
    out
}

/// Markup of the children of `node`, without the node itself.
pub fn inner_markup(doc: &Document, node: HostId) -> String {
    let mut out = String::new();
    for &child in doc.children(node) {
        write_markup(doc, child, &mut out);
    }
    out
}

fn write_markup(doc: &Document, node: HostId, out: &mut String) {
    if let Some(text) = doc.text(node) {
        out.push_str(&escape(text, false));
        return;
    }
    let Some(tag) = doc.tag(node) else {
        return;
    };
    out.push('<');
    out.push_str(tag);
    for (name, value) in attributes(doc, node) {
        out.push_str(&format!(" {name}=\"{}\"", escape(&value, true)));
    }
    out.push('>');
    for &child in doc.children(node) {
        write_markup(doc, child, out);
    }
    out.push_str(&format!("</{tag}>"));
}

fn attributes(doc: &Document, node: HostId) -> Vec<(String, String)> {
    let mut attrs: Vec<(String, String)> = doc
        .attributes(node)
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    let styles = doc.styles(node);
    if !styles.is_empty() {
        let inline = styles
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");
        match attrs.iter_mut().find(|(k, _)| k == "style") {
            Some((_, existing)) => {
                existing.push_str("; ");
                existing.push_str(&inline);
            }
            None => attrs.push(("style".into(), inline)),
        }
    }
    attrs
}

fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Clone, Debug, Default)]
pub struct Metrics {
    pub elapsed_ms: f32,
    /// Counters accumulated during the measured work.
    pub stats: RenderStats,
    pub host_nodes: usize,
    pub instances: usize,
}

/// Rolling summary of measured passes.
pub struct Hud {
    pub enabled: bool,
    pass_count: u64,
    elapsed_smooth: f32,
    pub metrics: Option<Metrics>,
}

impl Default for Hud {
    fn default() -> Self {
        Self::new()
    }
}

impl Hud {
    pub fn new() -> Self {
        Self {
            enabled: false,
            pass_count: 0,
            elapsed_smooth: 0.0,
            metrics: None,
        }
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    pub fn pass_count(&self) -> u64 {
        self.pass_count
    }

    pub fn record(&mut self, m: Metrics) {
        self.pass_count += 1;
        // simple EMA
        let a = 0.2;
        self.elapsed_smooth = if self.pass_count == 1 {
            m.elapsed_ms
        } else {
            (1.0 - a) * self.elapsed_smooth + a * m.elapsed_ms
        };
        self.metrics = Some(m);
    }

    /// One-line summary of the last measured pass.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("pass: {}", self.pass_count),
            format!("avg: {:.2} ms", self.elapsed_smooth),
        ];
        if let Some(m) = &self.metrics {
            lines.push(format!(
                "commits: {}  mounts: {}  unmounts: {}",
                m.stats.state_commits, m.stats.mounts, m.stats.unmounts
            ));
            lines.push(format!("nodes: {}  instances: {}", m.host_nodes, m.instances));
        }
        lines.join("  |  ")
    }
}

pub struct Inspector {
    pub hud: Hud,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self { hud: Hud::new() }
    }

    /// Runs `f` and records what it cost the runtime.
    pub fn measure<R>(&mut self, rt: &Runtime, f: impl FnOnce() -> R) -> R {
        let before = rt.stats();
        let start = Instant::now();
        let result = f();
        let metrics = Metrics {
            elapsed_ms: start.elapsed().as_secs_f32() * 1000.0,
            stats: rt.stats().since(&before),
            host_nodes: rt.document().len(),
            instances: rt.instance_count(),
        };
        self.hud.record(metrics);
        if self.hud.enabled {
            log::info!("{}", self.hud.summary());
        }
        result
    }

    /// Writes an indented outline of the host tree under `node`.
    pub fn write_tree(&self, rt: &Runtime, node: HostId, w: &mut impl Write) -> anyhow::Result<()> {
        let doc = rt.document();
        doc.get(node)
            .with_context(|| format!("host node {node:?} is not in the document"))?;
        write_outline(&doc, node, 0, w)
    }
}

fn write_outline(doc: &Document, node: HostId, depth: usize, w: &mut impl Write) -> anyhow::Result<()> {
    let indent = "  ".repeat(depth);
    if let Some(text) = doc.text(node) {
        writeln!(w, "{indent}{text:?}")?;
        return Ok(());
    }
    let tag = doc.tag(node).unwrap_or("?");
    let mut line = format!("{indent}{tag}");
    if let Some(id) = doc.attribute(node, "id") {
        line.push_str(&format!("#{id}"));
    }
    if let Some(class) = doc.attribute(node, "class") {
        for c in class.split_whitespace() {
            line.push_str(&format!(".{c}"));
        }
    }
    if doc.has_listeners(node) {
        line.push_str(" [listeners]");
    }
    writeln!(w, "{line}")?;
    for &child in doc.children(node) {
        write_outline(doc, child, depth + 1, w)?;
    }
    Ok(())
}
