use std::collections::{HashMap, HashSet};

use crate::error::{Result, WizardError};
use crate::ident::sanitize_ident;
use crate::models::{AliasedTable, JoinStep, TableRef};

/// Hands out statement-unique aliases in declaration order.
///
/// The first use of a name keeps it as-is; the N-th use becomes `name_N`. A
/// generated alias that is already taken (e.g. a table literally called `T_2`)
/// moves on to the next counter value.
#[derive(Debug, Default)]
pub struct AliasResolver {
    counts: HashMap<String, usize>,
    used: HashSet<String>,
}

impl AliasResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, candidate: &str) -> String {
        let base = sanitize_ident(candidate);
        let count = self.counts.entry(base.clone()).or_insert(0);
        *count += 1;
        let mut alias = if *count == 1 {
            base.clone()
        } else {
            format!("{base}_{count}")
        };
        while self.used.contains(&alias) {
            *count += 1;
            alias = format!("{base}_{count}");
        }
        self.used.insert(alias.clone());
        alias
    }
}

/// Aliases for the base table and each join step (`None` where no table is chosen
/// yet), aligned with the join steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAliases {
    pub base: AliasedTable,
    pub joins: Vec<Option<AliasedTable>>,
}

impl TableAliases {
    /// Every aliased table in chain order.
    pub fn tables(&self) -> impl Iterator<Item = &AliasedTable> {
        std::iter::once(&self.base).chain(self.joins.iter().flatten())
    }
}

/// One left-to-right pass: base table first, then join steps in declaration order.
pub fn assign_aliases(base: &TableRef, steps: &[JoinStep]) -> Result<TableAliases> {
    let mut resolver = AliasResolver::new();
    let mut resolve = |table: &TableRef| -> Result<AliasedTable> {
        let alias = resolver.resolve(&table.name);
        if sanitize_ident(&table.name).is_empty() {
            return Err(WizardError::Validation(format!(
                "table {table} has no usable identifier characters"
            )));
        }
        Ok(AliasedTable {
            table: table.clone(),
            alias,
        })
    };

    let base = resolve(base)?;
    let joins = steps
        .iter()
        .map(|step| step.right_table.as_ref().map(&mut resolve).transpose())
        .collect::<Result<Vec<_>>>()?;
    Ok(TableAliases { base, joins })
}
