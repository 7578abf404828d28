//! Column-header resolution.
//!
//! Exports from different systems name the same column differently
//! (`Item Code`, `Material`, `SKU`...). Headers are normalized and matched
//! against per-field synonym lists in three passes of decreasing strictness:
//! exact, containment, then a single-character typo.

use crate::domain::model::{ColumnMap, Field, HeaderOverrides, SourceKind};
use crate::utils::error::{ReconError, Result};
use std::collections::{BTreeMap, HashSet};

const SKU_SYNONYMS: &[&str] = &[
    "sku",
    "itemcode",
    "itemnumber",
    "itemno",
    "itemid",
    "stockcode",
    "stocknumber",
    "productcode",
    "productid",
    "productnumber",
    "partnumber",
    "partno",
    "materialnumber",
    "material",
    "articlenumber",
    "article",
    "upc",
    "ean",
    "item",
    "product",
    "part",
    "code",
];

const QUANTITY_SYNONYMS: &[&str] = &[
    "quantity",
    "qty",
    "qtyonhand",
    "onhandqty",
    "quantityonhand",
    "onhand",
    "stockqty",
    "stockquantity",
    "availableqty",
    "qtyavailable",
    "available",
    "stock",
    "balance",
    "units",
    "physicalcount",
    "counted",
    "count",
    "inventory",
    "adjustmentqty",
    "adjustment",
    "qtychange",
    "delta",
    "change",
];

const LOCATION_SYNONYMS: &[&str] = &[
    "location",
    "locationcode",
    "loc",
    "binlocation",
    "bin",
    "bincode",
    "storagelocation",
    "sloc",
    "warehouse",
    "warehousecode",
    "whse",
    "wh",
    "site",
    "plant",
    "zone",
    "aisle",
];

const DESCRIPTION_SYNONYMS: &[&str] = &[
    "description",
    "desc",
    "itemdescription",
    "productdescription",
    "productname",
    "itemname",
    "name",
    "title",
];

const REASON_SYNONYMS: &[&str] = &[
    "reason",
    "reasoncode",
    "adjustmentreason",
    "adjustmenttype",
    "type",
    "comment",
    "comments",
    "notes",
    "note",
    "memo",
];

const DATE_SYNONYMS: &[&str] = &[
    "date",
    "adjustmentdate",
    "postingdate",
    "transactiondate",
    "txndate",
    "effectivedate",
    "timestamp",
    "createdat",
    "created",
];

fn builtin_synonyms(field: Field) -> &'static [&'static str] {
    match field {
        Field::Sku => SKU_SYNONYMS,
        Field::Quantity => QUANTITY_SYNONYMS,
        Field::Location => LOCATION_SYNONYMS,
        Field::Description => DESCRIPTION_SYNONYMS,
        Field::Reason => REASON_SYNONYMS,
        Field::Date => DATE_SYNONYMS,
    }
}

/// Lowercase ASCII alphanumerics only; a leading BOM is dropped.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Normalized synonym lists, in priority order, for every field.
#[derive(Debug, Clone)]
pub struct HeaderSynonyms {
    by_field: BTreeMap<Field, Vec<String>>,
}

impl HeaderSynonyms {
    pub fn with_overrides(overrides: &HeaderOverrides) -> Self {
        let mut by_field = BTreeMap::new();

        for field in Field::ALL {
            let mut list: Vec<String> = Vec::new();
            let user = overrides.for_field(field).iter().map(|s| normalize_header(s));
            let builtin = builtin_synonyms(field).iter().map(|s| normalize_header(s));

            for synonym in user.chain(builtin) {
                if !synonym.is_empty() && !list.contains(&synonym) {
                    list.push(synonym);
                }
            }
            by_field.insert(field, list);
        }

        Self { by_field }
    }

    pub fn synonyms(&self, field: Field) -> &[String] {
        self.by_field
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Default for HeaderSynonyms {
    fn default() -> Self {
        Self::with_overrides(&HeaderOverrides::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchPass {
    Exact,
    Contains,
    Typo,
}

impl MatchPass {
    fn matches(self, header: &str, synonym: &str) -> bool {
        match self {
            MatchPass::Exact => header == synonym,
            MatchPass::Contains => synonym.len() >= 3 && header.contains(synonym),
            MatchPass::Typo => synonym.len() >= 5 && within_one_edit(header, synonym),
        }
    }
}

/// Resolve header positions for the wanted fields.
///
/// Every pass runs over all fields before the next, looser pass starts, and
/// each header can be claimed by one field only. Within a pass the earliest
/// synonym wins, then the leftmost column.
pub fn resolve_columns(
    headers: &[String],
    synonyms: &HeaderSynonyms,
    required: &[Field],
    optional: &[Field],
    source: SourceKind,
) -> Result<ColumnMap> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    let mut wanted: Vec<Field> = required.iter().chain(optional).copied().collect();
    wanted.sort();
    wanted.dedup();

    let mut resolved = BTreeMap::new();
    let mut claimed = HashSet::new();

    for pass in [MatchPass::Exact, MatchPass::Contains, MatchPass::Typo] {
        for &field in &wanted {
            if resolved.contains_key(&field) {
                continue;
            }
            if let Some(idx) = best_candidate(&normalized, &claimed, synonyms.synonyms(field), pass)
            {
                tracing::debug!(
                    "{} column '{}' resolved as {} ({:?} match)",
                    source,
                    headers[idx],
                    field,
                    pass
                );
                resolved.insert(field, idx);
                claimed.insert(idx);
            }
        }
    }

    for &field in required {
        if !resolved.contains_key(&field) {
            return Err(ReconError::MissingColumn {
                input: source,
                field,
                looked_for: synonyms.synonyms(field).to_vec(),
                found: headers.to_vec(),
            });
        }
    }

    Ok(ColumnMap {
        headers: headers.to_vec(),
        resolved,
    })
}

fn best_candidate(
    normalized: &[String],
    claimed: &HashSet<usize>,
    synonyms: &[String],
    pass: MatchPass,
) -> Option<usize> {
    synonyms.iter().find_map(|synonym| {
        normalized
            .iter()
            .enumerate()
            .filter(|(idx, header)| !claimed.contains(idx) && !header.is_empty())
            .find(|(_, header)| pass.matches(header, synonym))
            .map(|(idx, _)| idx)
    })
}

/// True when `a` and `b` differ by at most one insertion, deletion or substitution.
fn within_one_edit(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() {
        (a.as_bytes(), b.as_bytes())
    } else {
        (b.as_bytes(), a.as_bytes())
    };
    if long.len() - short.len() > 1 {
        return false;
    }

    let (mut i, mut j, mut edits) = (0, 0, 0);
    while i < short.len() && j < long.len() {
        if short[i] == long[j] {
            i += 1;
            j += 1;
            continue;
        }
        edits += 1;
        if edits > 1 {
            return false;
        }
        if short.len() == long.len() {
            i += 1;
        }
        j += 1;
    }

    edits + (short.len() - i) + (long.len() - j) <= 1
}
