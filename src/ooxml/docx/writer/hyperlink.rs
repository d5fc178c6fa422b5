/// Hyperlink support for DOCX documents.
use super::EmitContext;
use super::run::MutableRun;
use crate::common::xml::escape_xml;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::RelType;
use std::fmt::Write as FmtWrite;

/// Where a hyperlink points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperlinkTarget {
    /// An external URL, reached through an external relationship
    External(String),
    /// A bookmark name in this document; no relationship is involved
    Anchor(String),
}

/// A mutable hyperlink in a document.
#[derive(Debug, Clone)]
pub struct MutableHyperlink {
    pub(crate) target: HyperlinkTarget,
    /// Relationship id of an external target, assigned at staging
    pub(crate) r_id: Option<String>,
    pub(crate) runs: Vec<MutableRun>,
    /// Optional tooltip text
    pub(crate) tooltip: Option<String>,
    pub(crate) history: bool,
}

impl MutableHyperlink {
    /// Create a hyperlink to an external URL.
    pub fn external(url: impl Into<String>, text: &str) -> Self {
        Self::with_target(HyperlinkTarget::External(url.into()), text)
    }

    /// Create a hyperlink to a bookmark.
    pub fn internal(anchor: impl Into<String>, text: &str) -> Self {
        Self::with_target(HyperlinkTarget::Anchor(anchor.into()), text)
    }

    fn with_target(target: HyperlinkTarget, text: &str) -> Self {
        let mut run = MutableRun::with_text(text);
        run.style("Hyperlink");
        Self {
            target,
            r_id: None,
            runs: vec![run],
            tooltip: None,
            history: true,
        }
    }

    /// Set the tooltip text.
    pub fn set_tooltip(&mut self, tooltip: impl Into<String>) -> &mut Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn target(&self) -> &HyperlinkTarget {
        &self.target
    }

    /// The URL of an external link.
    pub fn url(&self) -> Option<&str> {
        match &self.target {
            HyperlinkTarget::External(url) => Some(url),
            HyperlinkTarget::Anchor(_) => None,
        }
    }

    pub fn relationship_id(&self) -> Option<&str> {
        self.r_id.as_deref()
    }

    pub fn runs(&self) -> &[MutableRun] {
        &self.runs
    }

    pub fn runs_mut(&mut self) -> &mut Vec<MutableRun> {
        &mut self.runs
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(MutableRun::text).collect()
    }

    /// Serialize the hyperlink. An external link must carry a relationship id
    /// that resolves to a hyperlink relationship in the owning part.
    pub(crate) fn to_xml(&self, xml: &mut String, ctx: &EmitContext<'_>) -> Result<()> {
        xml.push_str("<w:hyperlink");
        match &self.target {
            HyperlinkTarget::External(url) => {
                let r_id = self.r_id.as_deref().ok_or_else(|| {
                    OoxmlError::UnresolvedReference {
                        part: ctx.rels().source().to_string(),
                        id: format!("hyperlink to {}", url),
                    }
                })?;
                let rel = ctx.resolve(r_id)?;
                if *rel.reltype() != RelType::Hyperlink {
                    return Err(OoxmlError::UnresolvedReference {
                        part: ctx.rels().source().to_string(),
                        id: r_id.to_string(),
                    });
                }
                write!(xml, r#" r:id="{}""#, escape_xml(r_id))
                    .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            },
            HyperlinkTarget::Anchor(anchor) => {
                write!(xml, r#" w:anchor="{}""#, escape_xml(anchor))
                    .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            },
        }
        if let Some(ref tooltip) = self.tooltip {
            write!(xml, r#" w:tooltip="{}""#, escape_xml(tooltip))
                .map_err(|e| OoxmlError::Xml(e.to_string()))?;
        }
        if self.history {
            xml.push_str(r#" w:history="1""#);
        }
        xml.push('>');
        for run in &self.runs {
            run.to_xml(xml, ctx)?;
        }
        xml.push_str("</w:hyperlink>");
        Ok(())
    }
}
