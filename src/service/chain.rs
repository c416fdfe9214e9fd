use indexmap::map::Entry;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::error::ChainError;
use crate::models::{ChainEntry, InvoiceChain, InvoiceRelation};

/// 由扁平修订关系构建修订链
///
/// - 按 reference 分组, 组内从根发票 (未被任何发票指向的发票) 沿修订关系走到最新发票
/// - 每个根生成一条链, invoices 从新到旧排列, 第一条 is_latest = true
/// - 结果按链长度降序, 长度相同按 reference 升序
///
/// 组内同一发票号出现多次时保留第一条; 两张发票被同一张发票修订时保留先出现的修订关系;
/// 存在环时返回 [`ChainError::Cycle`]
pub fn build_chains(relations: &[InvoiceRelation]) -> Result<Vec<InvoiceChain>, ChainError> {
    let mut groups: IndexMap<&str, Vec<&InvoiceRelation>> = IndexMap::new();
    for relation in relations {
        groups
            .entry(relation.reference.as_str())
            .or_default()
            .push(relation);
    }

    let groups: Vec<(&str, Vec<&InvoiceRelation>)> = groups.into_iter().collect();
    let per_group: Vec<Vec<InvoiceChain>> = groups
        .par_iter()
        .map(|(reference, members)| build_group(reference, members))
        .collect::<Result<_, _>>()?;

    let mut chains: Vec<InvoiceChain> = per_group.into_iter().flatten().collect();
    chains.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| a.reference.cmp(&b.reference))
    });

    tracing::debug!(
        "built {} chains from {} relations",
        chains.len(),
        relations.len()
    );
    Ok(chains)
}

fn build_group(
    reference: &str,
    members: &[&InvoiceRelation],
) -> Result<Vec<InvoiceChain>, ChainError> {
    // 发票号 -> 关系 (保序, 先出现者优先)
    let mut by_number: IndexMap<&str, &InvoiceRelation> = IndexMap::new();
    for relation in members {
        match by_number.entry(relation.invoice_number.as_str()) {
            Entry::Occupied(_) => tracing::warn!(
                "reference {:?}: duplicate invoice {}, keeping first",
                reference,
                relation.invoice_number
            ),
            Entry::Vacant(slot) => {
                slot.insert(relation);
            }
        }
    }

    // 正向: 发票 -> 修订后发票; 反向: 修订后发票 -> 原发票
    let mut forward: HashMap<&str, &str> = HashMap::new();
    let mut reverse: HashMap<&str, &str> = HashMap::new();
    for (&number, relation) in &by_number {
        let Some(next) = relation.amended_by() else {
            continue;
        };
        if let Some(&kept) = reverse.get(next) {
            tracing::warn!(
                "reference {:?}: {} and {} both amended by {}, keeping {}",
                reference,
                kept,
                number,
                next,
                kept
            );
            continue;
        }
        reverse.insert(next, number);
        forward.insert(number, next);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut chains = Vec::new();

    for &root in by_number.keys().filter(|n| !reverse.contains_key(**n)) {
        visited.insert(root);
        let mut walk = vec![root];
        let mut current = root;
        while let Some(&next) = forward.get(current) {
            if !visited.insert(next) {
                return Err(ChainError::Cycle {
                    reference: reference.to_string(),
                    invoice_number: next.to_string(),
                });
            }
            walk.push(next);
            current = next;
        }
        chains.push(to_chain(reference, &walk, &by_number));
    }

    // 未被任何根走到的发票只可能位于环上
    if let Some(&stranded) = by_number.keys().find(|n| !visited.contains(**n)) {
        return Err(ChainError::Cycle {
            reference: reference.to_string(),
            invoice_number: stranded.to_string(),
        });
    }

    Ok(chains)
}

/// walk 为从旧到新的顺序; is_latest 按该顺序计算后整体反转
fn to_chain(
    reference: &str,
    walk: &[&str],
    by_number: &IndexMap<&str, &InvoiceRelation>,
) -> InvoiceChain {
    let last = walk.len() - 1;
    let mut invoices: Vec<ChainEntry> = walk
        .iter()
        .enumerate()
        .map(|(idx, &number)| {
            let relation = by_number.get(number);
            ChainEntry {
                invoice_number: number.to_string(),
                status: relation.map(|r| r.status),
                date: relation.map(|r| r.date),
                is_latest: idx == last,
            }
        })
        .collect();
    invoices.reverse();

    InvoiceChain {
        reference: reference.to_string(),
        invoices,
    }
}
