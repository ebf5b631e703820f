use log::trace;
use std::collections::BTreeSet;

/// Where a tokenizer rule goes relative to the other rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// In registration order
    Default,
    /// Before the named rule
    Before(String),
    /// After the named rule
    After(String),
    /// After all other rules
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OrderError {
    UnknownAnchor { rule: String, anchor: String },
    Cycle(Vec<String>),
}

/// Order named rules by their placement constraints. Ties are broken by registration order,
/// fallback rules come last.
pub(crate) fn order_rules<T>(rules: Vec<(String, Placement, T)>) -> Result<Vec<T>, OrderError> {
    let index_of = |name: &str| rules.iter().position(|(n, _, _)| n == name);
    let is_fallback = |i: usize| rules[i].1 == Placement::Fallback;

    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); rules.len()];
    let mut indegree = vec![0usize; rules.len()];
    for (i, (name, placement, _)) in rules.iter().enumerate() {
        let (anchor, before) = match placement {
            Placement::Before(anchor) => (anchor, true),
            Placement::After(anchor) => (anchor, false),
            _ => continue,
        };
        let j = index_of(anchor).ok_or_else(|| OrderError::UnknownAnchor {
            rule: name.clone(),
            anchor: anchor.clone(),
        })?;
        match (before, is_fallback(j)) {
            (true, true) => continue,
            (false, true) => return Err(OrderError::Cycle(vec![name.clone(), anchor.clone()])),
            (true, false) => {
                edges[i].push(j);
                indegree[j] += 1;
            }
            (false, false) => {
                edges[j].push(i);
                indegree[i] += 1;
            }
        }
        trace!(
            "rule `{}` goes {} `{}`",
            name,
            if before { "before" } else { "after" },
            anchor
        );
    }

    let regular: Vec<usize> = (0..rules.len()).filter(|i| !is_fallback(*i)).collect();
    let mut available: BTreeSet<usize> = regular
        .iter()
        .copied()
        .filter(|i| indegree[*i] == 0)
        .collect();
    let mut order = Vec::with_capacity(rules.len());
    while let Some(next) = available.iter().next().copied() {
        available.remove(&next);
        order.push(next);
        for to in &edges[next] {
            indegree[*to] -= 1;
            if indegree[*to] == 0 {
                available.insert(*to);
            }
        }
    }
    if order.len() < regular.len() {
        let stuck = regular
            .iter()
            .filter(|i| !order.contains(i))
            .map(|i| rules[*i].0.clone())
            .collect();
        return Err(OrderError::Cycle(stuck));
    }
    order.extend((0..rules.len()).filter(|i| is_fallback(*i)));
    trace!(
        "rule order: {:?}",
        order.iter().map(|i| rules[*i].0.as_str()).collect::<Vec<_>>()
    );

    let mut slots: Vec<Option<T>> = rules.into_iter().map(|(_, _, t)| Some(t)).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(rules: Vec<(&str, Placement)>) -> Result<Vec<String>, OrderError> {
        order_rules(
            rules
                .into_iter()
                .map(|(n, p)| (n.to_owned(), p, n.to_owned()))
                .collect(),
        )
    }

    #[test]
    fn test_stable_order() {
        let order = names(vec![
            ("paragraph", Placement::Fallback),
            ("heading", Placement::Default),
            ("fence", Placement::Default),
            ("table", Placement::Before("heading".into())),
            ("list", Placement::After("fence".into())),
        ])
        .unwrap();
        assert_eq!(order, vec!["fence", "table", "heading", "list", "paragraph"]);
    }

    #[test]
    fn test_unknown_anchor_and_cycle() {
        assert_eq!(
            names(vec![("a", Placement::Before("zzz".into()))]),
            Err(OrderError::UnknownAnchor {
                rule: "a".into(),
                anchor: "zzz".into()
            })
        );
        assert!(matches!(
            names(vec![
                ("a", Placement::Before("b".into())),
                ("b", Placement::Before("a".into())),
            ]),
            Err(OrderError::Cycle(_))
        ));
    }
}
