//! ダブル配列トライ
//!
//! このモジュールは、16ビットのラベル列をキーとするダブル配列トライを
//! 提供します。値は32ビット整数で、ノードごとに `(base, check)` の対を
//! 持つ平坦な配列として直列化されます。`check` は親ノードのインデックス
//! を保持し、実行時の品詞による絞り込みで親方向への巻き戻しに使われます。
//!
//! ラベル0は値スロットとして予約されているため、キーの要素は常に1以上
//! です。

use crate::character::decode;
use crate::model::CodeMap;

#[cfg(feature = "train")]
use hashbrown::HashMap;

/// ノードは存在するが値を持たないことを表す番兵値
pub const NO_VALUE: i32 = -1;

/// 辿るべき枝が存在しないことを表す番兵値
pub const NO_PATH: i32 = -2;

/// 空きスロットの `check` 値
const VACANT: i32 = -1;

const NODE_LEN: usize = 8;

/// メモリマップ上の読み取り専用ダブル配列
///
/// 学習器が直列化した配列をそのまま参照します。リトルエンディアンの
/// `(base, check)` 対が並んでいるだけで、ヘッダはありません。
#[derive(Clone, Copy)]
pub struct Trie<'a> {
    data: &'a [u8],
}

impl<'a> Trie<'a> {
    /// 直列化済みの配列からビューを作ります。
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.data.len() / NODE_LEN
    }

    #[inline(always)]
    fn base(&self, i: usize) -> i32 {
        let at = i * NODE_LEN;
        i32::from_le_bytes([
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
            self.data[at + 3],
        ])
    }

    #[inline(always)]
    fn check(&self, i: usize) -> i32 {
        let at = i * NODE_LEN + 4;
        i32::from_le_bytes([
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
            self.data[at + 3],
        ])
    }

    /// `from` からラベル1つ分だけ降ります。
    ///
    /// 枝があれば `from` を子に進め、子の値か [`NO_VALUE`] を返します。
    /// 枝がなければ `from` はそのままで [`NO_PATH`] を返します。
    #[inline(always)]
    fn step(&self, from: &mut usize, label: u16) -> i32 {
        let to = self.base(*from) + i32::from(label);
        if to <= 0 || to as usize >= self.num_nodes() || self.check(to as usize) != *from as i32 {
            return NO_PATH;
        }
        *from = to as usize;
        self.value_of(*from)
    }

    #[inline(always)]
    fn value_of(&self, node: usize) -> i32 {
        // 値はラベル0の子の base に格納されている
        let slot = self.base(node);
        if slot > 0 && (slot as usize) < self.num_nodes() && self.check(slot as usize) == node as i32
        {
            self.base(slot as usize)
        } else {
            NO_VALUE
        }
    }

    /// ラベル列を `key[pos..end]` の範囲で辿ります。
    ///
    /// カーソル `(from, pos)` は消費した分だけ進み、途中から再開できます。
    pub fn traverse(&self, key: &[u16], from: &mut usize, pos: &mut usize, end: usize) -> i32 {
        while *pos < end {
            let value = self.step(from, key[*pos]);
            if value == NO_PATH {
                return NO_PATH;
            }
            *pos += 1;
            if *pos == end {
                return value;
            }
        }
        self.value_of(*from)
    }

    /// 入力ウィンドウに対する最長一致パターン検索
    ///
    /// まず表層だけでウィンドウの先頭から最長一致を求め、次に直前の品詞id
    /// による絞り込みを試みます。到達した最深のノードから品詞の疑似コード
    /// ポイントで1段降りられればその値が優先され、降りられなければ `check`
    /// を親方向に巻き戻しながら浅い文脈で再試行します。巻き戻しが最後に値
    /// を見たノードまで達したら、表層のみの一致に落ちます。
    ///
    /// # 引数
    ///
    /// * `window` - 入力バイト列。妥当なUTF-8である必要はありません
    /// * `prev_pos_id` - 直前の形態素の品詞id。0なら絞り込みを行いません
    /// * `c2i` - コードポイントからキーidへの写像
    ///
    /// # 戻り値
    ///
    /// パックされた判定。一致がなければ0
    pub fn longest_pattern_search(&self, window: &[u8], prev_pos_id: u16, c2i: &CodeMap) -> u32 {
        let mut from = 0;
        let mut from_ = 0;
        let mut n = 0i32;
        let mut offset = 0;
        while offset < window.len() {
            let (cp, len) = decode(&window[offset..]);
            let id = c2i.id(cp as usize);
            if id == 0 {
                break;
            }
            let value = self.step(&mut from, id);
            if value == NO_PATH {
                break;
            }
            if value != NO_VALUE {
                from_ = from;
                n = value;
            }
            offset += len;
        }
        if prev_pos_id == 0 {
            return n as u32;
        }
        loop {
            let mut probe = from;
            let value = self.step(&mut probe, prev_pos_id);
            if value != NO_VALUE && value != NO_PATH {
                return value as u32;
            }
            if from == from_ {
                return n as u32;
            }
            let parent = self.check(from);
            if parent < 0 {
                return n as u32;
            }
            from = parent as usize;
        }
    }
}

/// 構築用の可変ダブル配列
///
/// 衝突したノードの子をまとめて移設する素朴な挿入を行います。挿入後は
/// [`to_bytes`](Self::to_bytes) で読み取り専用の配列へ直列化します。
#[cfg(feature = "train")]
pub struct TrieBuilder {
    base: Vec<i32>,
    check: Vec<i32>,
    labels: HashMap<usize, Vec<u16>>,
    head: usize,
}

#[cfg(feature = "train")]
impl TrieBuilder {
    pub fn new() -> Self {
        Self {
            base: vec![0],
            check: vec![VACANT],
            labels: HashMap::new(),
            head: 1,
        }
    }

    fn ensure(&mut self, n: usize) {
        if n >= self.base.len() {
            self.base.resize(n + 1, 0);
            self.check.resize(n + 1, VACANT);
        }
    }

    fn is_vacant(&self, i: usize) -> bool {
        i >= self.check.len() || self.check[i] == VACANT
    }

    /// すべてのラベルが空きスロットに収まる base を探します。
    fn find_base(&mut self, labels: &[u16]) -> i32 {
        while !self.is_vacant(self.head) {
            self.head += 1;
        }
        let max_label = i32::from(labels.iter().copied().max().unwrap_or(0));
        let mut b = (self.head as i32 - max_label).max(1);
        'search: loop {
            for &l in labels {
                if !self.is_vacant((b + i32::from(l)) as usize) {
                    b += 1;
                    continue 'search;
                }
            }
            return b;
        }
    }

    fn follow(&mut self, from: usize, label: u16) -> usize {
        let has_children = self.labels.get(&from).is_some_and(|v| !v.is_empty());
        if !has_children {
            let b = self.find_base(&[label]);
            self.base[from] = b;
            let to = (b + i32::from(label)) as usize;
            self.ensure(to);
            self.check[to] = from as i32;
            self.labels.entry(from).or_default().push(label);
            return to;
        }
        let to = (self.base[from] + i32::from(label)) as usize;
        if !self.is_vacant(to) {
            if self.check[to] == from as i32 {
                return to;
            }
            return self.relocate(from, label);
        }
        self.ensure(to);
        self.check[to] = from as i32;
        self.labels.entry(from).or_default().push(label);
        to
    }

    /// `from` の子をまとめて新しい base へ移し、新しいラベルのスロットを返します。
    fn relocate(&mut self, from: usize, label: u16) -> usize {
        let moved = self.labels.get(&from).cloned().unwrap_or_default();
        let mut wanted = moved.clone();
        wanted.push(label);
        let nb = self.find_base(&wanted);
        let ob = self.base[from];
        for &l in &moved {
            let old = (ob + i32::from(l)) as usize;
            let new = (nb + i32::from(l)) as usize;
            self.ensure(new);
            self.base[new] = self.base[old];
            self.check[new] = from as i32;
            if let Some(grand) = self.labels.remove(&old) {
                // 孫の親ポインタを移設先に付け替える
                for &g in &grand {
                    self.check[(self.base[old] + i32::from(g)) as usize] = new as i32;
                }
                self.labels.insert(new, grand);
            }
            self.base[old] = 0;
            self.check[old] = VACANT;
            if old < self.head {
                self.head = old;
            }
        }
        self.base[from] = nb;
        let to = (nb + i32::from(label)) as usize;
        self.ensure(to);
        self.check[to] = from as i32;
        self.labels.entry(from).or_default().push(label);
        to
    }

    /// キーに対応する値スロットを返します。無ければ挿入します。
    pub fn update(&mut self, key: &[u16]) -> &mut i32 {
        debug_assert!(!key.is_empty());
        let mut from = 0;
        for &k in key {
            debug_assert_ne!(k, 0);
            from = self.follow(from, k);
        }
        let leaf = self.follow(from, 0);
        &mut self.base[leaf]
    }

    /// バイト列をキーとして値スロットを返します。
    pub fn update_bytes(&mut self, key: &[u8]) -> &mut i32 {
        let labels: Vec<u16> = key.iter().map(|&b| u16::from(b) + 1).collect();
        self.update(&labels)
    }

    /// ラベル列を `key[pos..end]` の範囲で辿ります。
    pub fn traverse(&self, key: &[u16], from: &mut usize, pos: &mut usize, end: usize) -> i32 {
        while *pos < end {
            if !self.step(from, key[*pos]) {
                return NO_PATH;
            }
            *pos += 1;
        }
        self.value_at(*from)
    }

    /// バイト列をキーとして辿ります。
    pub fn traverse_bytes(&self, key: &[u8], from: &mut usize, pos: &mut usize, end: usize) -> i32 {
        while *pos < end {
            if !self.step(from, u16::from(key[*pos]) + 1) {
                return NO_PATH;
            }
            *pos += 1;
        }
        self.value_at(*from)
    }

    fn step(&self, from: &mut usize, label: u16) -> bool {
        let to = self.base[*from] + i32::from(label);
        if to <= 0 || to as usize >= self.check.len() || self.check[to as usize] != *from as i32 {
            return false;
        }
        *from = to as usize;
        true
    }

    fn value_at(&self, node: usize) -> i32 {
        let slot = self.base[node];
        if slot > 0 && (slot as usize) < self.check.len() && self.check[slot as usize] == node as i32
        {
            self.base[slot as usize]
        } else {
            NO_VALUE
        }
    }

    /// `(base, check)` の対をリトルエンディアンで直列化します。
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.base.len() * NODE_LEN);
        for i in 0..self.base.len() {
            out.extend_from_slice(&self.base[i].to_le_bytes());
            out.extend_from_slice(&self.check[i].to_le_bytes());
        }
        out
    }
}

#[cfg(feature = "train")]
impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}
