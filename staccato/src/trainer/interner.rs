//! キーへの一意なid割り当て

use std::collections::BTreeMap;

/// キーに挿入順の密なidを割り当てる双方向テーブル
///
/// [`iter`](Self::iter) はキーの昇順で返します。パターンの選別処理は
/// 接頭辞が延長形より先に現れるこの順序に依存しています。
pub(crate) struct Interner<K: Ord + Clone> {
    key2id: BTreeMap<K, u32>,
    id2key: Vec<K>,
}

impl<K: Ord + Clone> Interner<K> {
    pub(crate) fn new() -> Self {
        Self {
            key2id: BTreeMap::new(),
            id2key: Vec::new(),
        }
    }

    /// 登録済みのキー数を返します。
    pub(crate) fn len(&self) -> usize {
        self.id2key.len()
    }

    /// キーのidを返します。未登録なら新たに採番します。
    pub(crate) fn intern(&mut self, key: K) -> usize {
        if let Some(&id) = self.key2id.get(&key) {
            return id as usize;
        }
        let id = self.id2key.len() as u32;
        self.id2key.push(key.clone());
        self.key2id.insert(key, id);
        id as usize
    }

    /// idに対応するキーを返します。
    pub(crate) fn resolve(&self, id: usize) -> &K {
        &self.id2key[id]
    }

    /// id順にキーを返します。
    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> {
        self.id2key.iter()
    }

    /// キーの昇順に `(キー, id)` を返します。
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&K, usize)> {
        self.key2id.iter().map(|(k, &id)| (k, id as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let mut interner = Interner::new();
        assert_eq!(interner.intern("b".to_string()), 0);
        assert_eq!(interner.intern("a".to_string()), 1);
        assert_eq!(interner.intern("b".to_string()), 0);
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.resolve(1), "a");
        // idは挿入順、iterはキー順
        let keys: Vec<_> = interner.keys().cloned().collect();
        assert_eq!(keys, ["b", "a"]);
        let sorted: Vec<_> = interner.iter().map(|(k, id)| (k.clone(), id)).collect();
        assert_eq!(sorted, [("a".to_string(), 1), ("b".to_string(), 0)]);
    }
}
