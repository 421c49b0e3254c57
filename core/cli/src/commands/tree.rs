use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use car_extract::car::CarBlockstore;
use car_extract::decoder::DecoderRegistry;
use car_extract::Blockstore;
use cid::Cid;

pub async fn exec(car: &Path) -> Result<()> {
    let store = CarBlockstore::open(car)
        .await
        .with_context(|| format!("Failed to open CAR: {}", car.display()))?;
    let root = *store
        .roots()
        .first()
        .ok_or_else(|| anyhow!("CAR has no roots: {}", car.display()))?;

    let registry = DecoderRegistry::default();
    let mut children = HashMap::new();
    for cid in store.cids() {
        if children.contains_key(cid) {
            continue;
        }
        let Some(block) = store.get(cid).await? else {
            continue;
        };
        let links = registry
            .decode(&block)
            .with_context(|| format!("Failed to decode block: {cid}"))?
            .links()
            .iter()
            .map(|link| *link.cid())
            .collect::<Vec<_>>();
        children.insert(*cid, links);
    }

    print!("{}", render(root, &children));
    Ok(())
}

/// Draw the graph below `root` as an indented tree. Blocks the archive does not contain are
/// marked as missing.
pub fn render(root: Cid, children: &HashMap<Cid, Vec<Cid>>) -> String {
    let mut out = String::new();
    // (cid, indentation of its children, prefix of its own line)
    let mut stack = vec![(root, String::new(), String::new())];
    while let Some((cid, indent, prefix)) = stack.pop() {
        out.push_str(&prefix);
        out.push_str(&cid.to_string());
        let Some(links) = children.get(&cid) else {
            out.push_str(" (missing)\n");
            continue;
        };
        out.push('\n');

        for (i, link) in links.iter().enumerate().rev() {
            let last = i + 1 == links.len();
            let (branch, next) = if last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            stack.push((*link, format!("{indent}{next}"), format!("{indent}{branch}")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use cid::multihash::Multihash;
    use pretty_assertions::assert_eq;
    use sha2::{Digest, Sha256};

    use super::*;

    fn cid(name: &str) -> Cid {
        let digest = Sha256::digest(name.as_bytes());
        Cid::new_v1(0x55, Multihash::wrap(0x12, &digest).unwrap())
    }

    #[test]
    fn test_render_tree() {
        let (root, a, b, c, absent) = (cid("root"), cid("a"), cid("b"), cid("c"), cid("x"));
        let children = HashMap::from([
            (root, vec![a, b]),
            (a, vec![c, absent]),
            (b, vec![]),
            (c, vec![]),
        ]);

        let expected = format!(
            "{root}\n├── {a}\n│   ├── {c}\n│   └── {absent} (missing)\n└── {b}\n"
        );
        assert_eq!(render(root, &children), expected);
    }

    #[test]
    fn test_render_missing_root() {
        let root = cid("root");
        assert_eq!(render(root, &HashMap::new()), format!("{root} (missing)\n"));
    }
}
