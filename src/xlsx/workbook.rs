//! Workbook metadata: the sheet list and the date system.

use crate::container::{resolve_path, Relationships};
use crate::error::{Error, Result};

/// Path of the workbook part inside the package.
pub const WORKBOOK_PART: &str = "xl/workbook.xml";

/// A worksheet as listed in xl/workbook.xml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    /// Display name.
    pub name: String,
    /// `sheetId` attribute.
    pub id: u32,
    /// Relationship id pointing at the worksheet part, if any.
    pub rel_id: Option<String>,
    /// Part that holds the sheet's rows.
    pub path: String,
}

impl Sheet {
    /// Part path derived from the sheet id, used when the workbook
    /// relationships do not name the part.
    pub fn conventional_path(id: u32) -> String {
        format!("xl/worksheets/sheet{}.xml", id)
    }
}

/// Sheets and date system of a workbook.
#[derive(Debug, Clone, Default)]
pub struct WorkbookInfo {
    /// Sheets in workbook order.
    pub sheets: Vec<Sheet>,
    /// Whether serials count from 1904-01-01 instead of 1900.
    pub date1904: bool,
}

impl WorkbookInfo {
    /// Parse xl/workbook.xml.
    ///
    /// `rels` are the workbook relationships; a sheet whose `r:id` resolves
    /// there reads from the referenced part, any other sheet falls back to
    /// [`Sheet::conventional_path`].
    pub fn parse(xml: &str, rels: &Relationships) -> Result<Self> {
        let mut info = Self::default();
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut saw_sheets = false;
        let mut in_date1904 = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(quick_xml::events::Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"date1904" {
                        in_date1904 = true;
                    } else {
                        info.apply_element(e, rels, &mut saw_sheets)?;
                    }
                }
                Ok(quick_xml::events::Event::Empty(ref e)) => {
                    info.apply_element(e, rels, &mut saw_sheets)?;
                }
                Ok(quick_xml::events::Event::Text(e)) => {
                    if in_date1904 {
                        info.date1904 = e.unescape()?.trim() == "1";
                    }
                }
                Ok(quick_xml::events::Event::End(ref e)) => {
                    if e.local_name().as_ref() == b"date1904" {
                        in_date1904 = false;
                    }
                }
                Ok(quick_xml::events::Event::Eof) => break,
                Err(e) => return Err(Error::XmlParse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if !saw_sheets {
            return Err(Error::MalformedDocument(
                "workbook has no sheets element".to_string(),
            ));
        }

        Ok(info)
    }

    fn apply_element(
        &mut self,
        e: &quick_xml::events::BytesStart<'_>,
        rels: &Relationships,
        saw_sheets: &mut bool,
    ) -> Result<()> {
        match e.local_name().as_ref() {
            b"sheets" => *saw_sheets = true,
            b"sheet" => self.sheets.push(parse_sheet(e, rels)?),
            b"workbookPr" => {
                if let Some(attr) = e.try_get_attribute("date1904")? {
                    let value = attr.unescape_value()?;
                    self.date1904 = value == "1" || value == "true";
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse_sheet(e: &quick_xml::events::BytesStart<'_>, rels: &Relationships) -> Result<Sheet> {
    let mut name = None;
    let mut id = None;
    let mut rel_id = None;

    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key;
        match key.as_ref() {
            b"name" => name = Some(attr.unescape_value()?.into_owned()),
            b"sheetId" => id = Some(attr.unescape_value()?.into_owned()),
            _ if key.local_name().as_ref() == b"id" && key.prefix().is_some() => {
                rel_id = Some(attr.unescape_value()?.into_owned())
            }
            _ => {}
        }
    }

    let name =
        name.ok_or_else(|| Error::MalformedDocument("sheet without name".to_string()))?;
    let id = id
        .ok_or_else(|| Error::MalformedDocument(format!("sheet {} without sheetId", name)))?;
    let id: u32 = id.trim().parse().map_err(|_| {
        Error::MalformedDocument(format!("sheet {} has invalid sheetId {}", name, id))
    })?;

    let path = rel_id
        .as_deref()
        .and_then(|rid| rels.get(rid))
        .filter(|rel| !rel.external)
        .map(|rel| resolve_path(WORKBOOK_PART, &rel.target))
        .unwrap_or_else(|| Sheet::conventional_path(id));

    Ok(Sheet {
        name,
        id,
        rel_id,
        path,
    })
}
