//! 学習コーパスと辞書からのパターン抽出とモデルのコンパイル
//!
//! 学習は3段階で進みます。まず辞書の語と文字の一覧表からシードパターンを
//! 登録し、次にコーパスの各トークンから表層を1文字ずつ延長した候補
//! パターンを数え上げ、最後に各パターンへ1つの判定 (シフト量・文字種・
//! 素性) を確定して、冗長なパターンを取り除きながらアーティファクトへ
//! コンパイルします。
//!
//! パターンは「表層」と「表層 + 直前の品詞」の2系統で保持され、後者は
//! 品詞の疑似コードポイントをキー末尾に足した形で同じトライに格納され
//! ます。

mod interner;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::character::{
    ctype, surface_ctype, u8_len, CONCAT_INVENTORIES, CP_MAX, SYMBOL_RANGES,
};
use crate::errors::{Result, StaccatoError};
use crate::model::ARTIFACT_STEM;
use crate::record::{Decision, FeatureInfo, MAX_FEATURE_BITS, MAX_PATTERN_BITS};
use crate::trie::{TrieBuilder, NO_PATH, NO_VALUE};
use crate::utils::{nth_comma, parse_csv_row};

use self::interner::Interner;

/// 未知語の品詞 (名詞,普通名詞)
const FEAT_UNK: &str = "\t名詞,普通名詞,*,*";
/// 数詞の品詞
const FEAT_NUM: &str = "\t名詞,数詞,*,*";
/// 記号の品詞
const FEAT_SYMBOL: &str = "\t特殊,記号,*,*";

/// 品詞として扱う素性フィールド数
const NUM_POS_FIELD: usize = 4;

/// 学習時に1パターンへ確定した判定
struct PatternRecord {
    surface: String,
    ti_prev: i32,
    count: u32,
    shift: usize,
    ctype: u32,
    fi: usize,
}

/// 学習コーパスと辞書からパターンを抽出し、モデルを書き出すビルダー
///
/// # 使用例
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use staccato::PatternBuilder;
///
/// let corpus = "本\t名詞,普通名詞,*,*,本,ほん\nEOS\n";
/// let dir = tempfile::tempdir()?;
/// let mut builder = PatternBuilder::new();
/// builder.extract_from_readers(corpus.as_bytes(), Vec::<&[u8]>::new())?;
/// builder.write_patterns(dir.path())?;
/// # Ok(())
/// # }
/// ```
pub struct PatternBuilder {
    tbag: Interner<String>,
    fbag: Interner<String>,
    records: Vec<PatternRecord>,
    ccnt: Vec<(u64, usize)>,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self {
            tbag: Interner::new(),
            fbag: Interner::new(),
            records: Vec::new(),
            ccnt: Vec::new(),
        }
    }

    /// コーパスと辞書のファイルパスからパターンを抽出します。
    ///
    /// # 引数
    ///
    /// * `corpus` - 学習コーパスのパス
    /// * `dicts` - CSV辞書のパス列
    pub fn extract_patterns<P: AsRef<Path>>(&mut self, corpus: P, dicts: &[PathBuf]) -> Result<()> {
        let corpus = corpus.as_ref();
        let corpus_file = File::open(corpus).map_err(|e| {
            StaccatoError::invalid_argument("corpus", format!("cannot read {}: {e}", corpus.display()))
        })?;
        let mut dict_files = Vec::with_capacity(dicts.len());
        for path in dicts {
            dict_files.push(File::open(path).map_err(|e| {
                StaccatoError::invalid_argument("dict", format!("cannot read {}: {e}", path.display()))
            })?);
        }
        self.extract_from_readers(corpus_file, dict_files)
    }

    /// リーダーからパターンを抽出します。
    ///
    /// コーパスは「表層 TAB 素性」の行が並び、文の終わりに `EOS` 行が
    /// 置かれた形式です。辞書は表層を1列目に置いたCSVで、2〜4列目の語彙
    /// 情報を読み飛ばした残りを素性として扱います。
    pub fn extract_from_readers<R, D>(&mut self, corpus: R, dicts: Vec<D>) -> Result<()>
    where
        R: Read,
        D: Read,
    {
        let mut pbag: Interner<(String, i32)> = Interner::new();
        let mut pi2sfic: Vec<BTreeMap<(usize, usize), u32>> = Vec::new();
        let mut si2ti2fi: Vec<BTreeMap<usize, usize>> = Vec::new();
        let mut ti2c: Vec<i64> = vec![-1];
        let mut char_table = vec![0u8; CP_MAX + 1];

        self.tbag.intern("\tBOS".to_string());
        self.tbag.intern(FEAT_UNK.to_string());
        self.tbag.intern(FEAT_NUM.to_string());
        self.tbag.intern(FEAT_SYMBOL.to_string());

        if !dicts.is_empty() {
            eprint!("reading seed patterns from dictionaries...");
            for dict in dicts {
                self.read_dictionary(dict, &mut pbag, &mut si2ti2fi)?;
            }
            eprintln!(" done; {} words, {} features", si2ti2fi.len(), self.fbag.len());
        }
        let num_seed = pbag.len();

        eprint!("registering concatenating chars and symbols as seed patterns...");
        for (i, inventory) in CONCAT_INVENTORIES.iter().enumerate() {
            for c in inventory.chars() {
                pbag.intern((c.to_string(), -1));
                char_table[c as usize] = 1 << i;
            }
        }
        for &(lo, hi) in SYMBOL_RANGES {
            for cp in lo..=hi {
                if let Some(c) = char::from_u32(cp) {
                    pbag.intern((c.to_string(), -1));
                }
            }
        }
        eprintln!(" done.");
        ti2c.resize(self.tbag.len(), 0);
        if pi2sfic.len() < pbag.len() {
            pi2sfic.resize_with(pbag.len(), BTreeMap::new);
        }

        eprint!("mining patterns from training data...");
        self.mine_corpus(corpus, &mut pbag, &mut pi2sfic, &mut ti2c, &char_table, num_seed)?;
        eprintln!(" done; {} pattern candidates", pbag.len());

        self.decide_patterns(&pbag, &pi2sfic, &si2ti2fi, &ti2c, &char_table, num_seed)
    }

    /// CSV辞書の各行をシードパターンとして登録します。
    fn read_dictionary<D: Read>(
        &mut self,
        dict: D,
        pbag: &mut Interner<(String, i32)>,
        si2ti2fi: &mut Vec<BTreeMap<usize, usize>>,
    ) -> Result<()> {
        let mut reader = BufReader::new(dict);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            let row = line.trim_end_matches('\n');
            if row.is_empty() {
                continue;
            }
            let fields = parse_csv_row(row);
            if fields.len() < 5 {
                return Err(StaccatoError::invalid_format(
                    "dict",
                    format!("A csv row of dictionary must have five items at least: {row}"),
                ));
            }
            let surface = &fields[0];
            if surface.is_empty() {
                eprintln!("Skipped an empty surface: {row}");
                continue;
            }
            if surface.len() >> MAX_PATTERN_BITS != 0 {
                return Err(StaccatoError::PatternTooLong {
                    surface: surface.clone(),
                    max: (1 << MAX_PATTERN_BITS) - 1,
                });
            }
            let pi = pbag.intern((surface.clone(), -1));
            let feature = format!("\t{}\n", fields[4..].join(","));
            let ti = self.tbag.intern(feature[..nth_comma(&feature, NUM_POS_FIELD)].to_string());
            let fi = self.fbag.intern(feature);
            if si2ti2fi.len() < pbag.len() {
                si2ti2fi.resize_with(pbag.len(), BTreeMap::new);
            }
            si2ti2fi[pi].entry(ti).or_insert(fi);
        }
        Ok(())
    }

    /// コーパスの各トークンから候補パターンを数え上げます。
    fn mine_corpus<R: Read>(
        &mut self,
        corpus: R,
        pbag: &mut Interner<(String, i32)>,
        pi2sfic: &mut Vec<BTreeMap<(usize, usize), u32>>,
        ti2c: &mut Vec<i64>,
        char_table: &[u8],
        num_seed: usize,
    ) -> Result<()> {
        let max_plen = 1usize << MAX_PATTERN_BITS;
        let mut reader = BufReader::new(corpus);
        let mut line = String::new();
        let mut cs = String::new();
        let mut tokens: Vec<(usize, String)> = Vec::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            if line == "EOS\n" || line == "EOS" {
                let mut i = 0;
                let mut ti_prev = 0;
                for (slen, feature) in &tokens {
                    let shift = *slen;
                    let fi = self.fbag.intern(feature.clone());
                    if shift >> MAX_PATTERN_BITS != 0 {
                        return Err(StaccatoError::PatternTooLong {
                            surface: cs[i..i + shift].to_string(),
                            max: (1 << MAX_PATTERN_BITS) - 1,
                        });
                    }
                    // トークンの表層から1文字ずつ延長した候補を登録する。
                    // 新規のパターンが現れた延長で打ち切る
                    let mut k = shift;
                    loop {
                        let fresh = pbag.len();
                        let pi = pbag.intern((cs[i..i + k].to_string(), -1));
                        let pi_ = pbag.intern((cs[i..i + k].to_string(), ti_prev as i32));
                        if pi2sfic.len() < pbag.len() {
                            pi2sfic.resize_with(pbag.len(), BTreeMap::new);
                        }
                        *pi2sfic[pi].entry((shift, fi)).or_insert(0) += 1;
                        *pi2sfic[pi_].entry((shift, fi)).or_insert(0) += 1;
                        if pi >= fresh || i + k >= cs.len() {
                            break;
                        }
                        k += u8_len(cs.as_bytes()[i + k]);
                        if k > max_plen {
                            break;
                        }
                    }
                    let ti = self
                        .tbag
                        .intern(feature[..nth_comma(feature, NUM_POS_FIELD)].to_string());
                    let n = pbag.intern((cs[i..i + shift].to_string(), -1));
                    if n >= num_seed
                        && surface_ctype(&cs[i..i + shift], char_table, ctype::ANY) != ctype::NUM
                    {
                        // 未知語の証拠。表層を持たない品詞だけのパターンを育てる
                        if ti2c.len() < self.tbag.len() {
                            ti2c.resize(self.tbag.len(), 0);
                        }
                        ti2c[ti] += 1;
                        let pi = pbag.intern((String::new(), ti_prev as i32));
                        let fi_unk = self.fbag.intern(format!("{},*,*,*\n", self.tbag.resolve(ti)));
                        if pi2sfic.len() < pbag.len() {
                            pi2sfic.resize_with(pbag.len(), BTreeMap::new);
                        }
                        *pi2sfic[pi].entry((0, fi_unk)).or_insert(0) += 1;
                    }
                    i += shift;
                    ti_prev = ti;
                }
                cs.clear();
                tokens.clear();
            } else {
                let Some(tab) = line.find('\t') else {
                    return Err(StaccatoError::invalid_format(
                        "corpus",
                        format!("A corpus line must contain a tab: {}", line.trim_end()),
                    ));
                };
                cs.push_str(&line[..tab]);
                tokens.push((tab, line[tab..].to_string()));
            }
        }
        Ok(())
    }

    /// 各候補パターンへ判定を確定し、冗長なものを取り除きます。
    ///
    /// 観測のあるパターンは、シフト量の総数が最大 (同数なら長い方) の
    /// シフトと、そのシフトの中で最多の素性を選びます。確定した判定が、
    /// すでに残した表層のみの最長の接頭辞パターンと一致する場合、その
    /// パターンは最長一致で同じ結果になるため捨てられます。
    fn decide_patterns(
        &mut self,
        pbag: &Interner<(String, i32)>,
        pi2sfic: &[BTreeMap<(usize, usize), u32>],
        si2ti2fi: &[BTreeMap<usize, usize>],
        ti2c: &[i64],
        char_table: &[u8],
        num_seed: usize,
    ) -> Result<()> {
        let max_plen = 1usize << MAX_PATTERN_BITS;
        self.ccnt = (0..CP_MAX + 1 + self.tbag.len()).map(|i| (0, i)).collect();
        eprint!("pruning patterns...");
        let mut max_ti = 0;
        for (t, &c) in ti2c.iter().enumerate() {
            if c > ti2c[max_ti] {
                max_ti = t;
            }
        }
        let mut prune = TrieBuilder::new();
        for ((surface, ti_prev), pi) in pbag.iter() {
            let mut shift = surface.len();
            let mut fi = 0;
            let mut count = 0;
            if pi2sfic[pi].is_empty() {
                if pi < num_seed {
                    // 辞書語は、未知語として最も多く観測された品詞の素性を採る
                    let ti2fi = &si2ti2fi[pi];
                    let mut ti = 0;
                    for &t in ti2fi.keys() {
                        if ti2c[t] >= ti2c[ti] {
                            ti = t;
                        }
                    }
                    fi = ti2fi[&ti];
                } else if surface_ctype(surface, char_table, ctype::ANY) == ctype::NUM {
                    fi = self.fbag.intern(format!("{FEAT_NUM},*,*,*\n"));
                } else if surface_ctype(surface, char_table, ctype::ANY) != ctype::OTHER {
                    // 表層をそのまま原形と読みに使う
                    fi = self.fbag.intern(format!(
                        "{},{},{},*\n",
                        self.tbag.resolve(max_ti),
                        surface,
                        surface
                    ));
                } else {
                    fi = self.fbag.intern(format!("{FEAT_SYMBOL},*,*,*\n"));
                }
            } else {
                let observed = &pi2sfic[pi];
                let mut s2c = vec![0u32; max_plen + 1];
                for (&(s, _), &c) in observed {
                    s2c[s] += c;
                }
                let mut best = 0;
                for s in (0..=max_plen).rev() {
                    if s2c[s] > best {
                        best = s2c[s];
                        shift = s;
                    }
                }
                for (&(s, f), &c) in observed {
                    if s == shift && c > count {
                        count = c;
                        fi = f;
                    }
                }
                let bytes = surface.as_bytes();
                let (mut from, mut pos) = (0, 0);
                let mut subsumed = None;
                while pos < bytes.len() {
                    let end = pos + 1;
                    let value = prune.traverse_bytes(bytes, &mut from, &mut pos, end);
                    if value == NO_PATH {
                        break;
                    }
                    if value != NO_VALUE {
                        subsumed = Some(value as usize);
                    }
                }
                if let Some(at) = subsumed {
                    let kept = &self.records[at];
                    if kept.shift == shift && kept.fi == fi {
                        continue;
                    }
                }
            }
            let init = if shift > 0 { ctype::ANY } else { ctype::OTHER };
            let ctype = surface_ctype(&surface[..shift], char_table, init);
            for c in surface.chars() {
                self.ccnt[c as usize].0 += u64::from(count) + 1;
            }
            if *ti_prev != -1 {
                self.ccnt[CP_MAX + 1 + *ti_prev as usize].0 += u64::from(count) + 1;
            } else {
                *prune.update_bytes(surface.as_bytes()) = self.records.len() as i32;
            }
            self.records.push(PatternRecord {
                surface: surface.clone(),
                ti_prev: *ti_prev,
                count,
                shift,
                ctype,
                fi,
            });
        }
        eprintln!(" done; {} -> {} patterns", pi2sfic.len(), self.records.len());
        Ok(())
    }

    /// パターンをコンパイルし、4つのアーティファクトを書き出します。
    ///
    /// あわせて、頻度順のパターン一覧を `patterns` という名前の
    /// テキストファイルとして同じディレクトリに残します。
    pub fn write_patterns<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        if self.records.is_empty() {
            return Err(StaccatoError::invalid_argument(
                "patterns",
                "no patterns have been extracted",
            ));
        }
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let stem = dir.join(ARTIFACT_STEM);
        eprint!("building the double array from patterns...");

        let mut fsbag: Interner<(usize, usize)> = Interner::new();
        let mut out_fbag: Interner<String> = Interner::new();
        if cfg!(feature = "compact-dict") {
            out_fbag.intern(",*,*,*\n".to_string());
        } else {
            out_fbag.intern(format!("{FEAT_UNK},*,*,*\n"));
        }
        fsbag.intern((0, 1)); // 素性id 0 は未知語

        // 使用頻度の降順で密なキーidを振る。先頭の要素は動かさず、
        // コードポイント0のidを0のままにする
        self.ccnt[1..].sort_unstable_by(|a, b| b.cmp(a));
        let mut c2i = vec![0u16; self.ccnt.len()];
        for (rank, &(cnt, code)) in self.ccnt.iter().enumerate().skip(1) {
            if cnt == 0 {
                break;
            }
            let id = u16::try_from(rank).map_err(|_| {
                StaccatoError::invalid_format("c2i", "too many distinct characters in the corpus")
            })?;
            c2i[code] = id;
        }
        let mut c2i_bytes = Vec::with_capacity((CP_MAX + 2) * 2);
        for &id in &c2i[..CP_MAX + 2] {
            c2i_bytes.extend_from_slice(&id.to_le_bytes());
        }
        fs::write(stem.with_extension("c2i"), c2i_bytes)?;

        self.records.sort_unstable_by(|a, b| {
            b.count.cmp(&a.count).then_with(|| b.surface.cmp(&a.surface))
        });

        let mut listing = BufWriter::new(File::create(&stem)?);
        let mut trie = TrieBuilder::new();
        let mut key = Vec::new();
        for rec in &self.records {
            let feature = self.fbag.resolve(rec.fi);
            let pos_column = if rec.ti_prev == -1 {
                "\t"
            } else {
                self.tbag.resolve(rec.ti_prev as usize).as_str()
            };
            write!(
                listing,
                "{}\t{}{}\t{}\t{}{}",
                rec.count, rec.surface, pos_column, rec.shift, rec.ctype, feature
            )?;

            let core_end = nth_comma(feature, NUM_POS_FIELD);
            let ti = self.tbag.intern(feature[..core_end].to_string());
            let cut = if cfg!(feature = "compact-dict") { core_end } else { 0 };
            let ofi = out_fbag.intern(feature[cut..].to_string());
            let pi = fsbag.intern((ofi, ti));
            if pi >> 20 != 0 {
                return Err(StaccatoError::invalid_format(
                    "patterns",
                    "too many distinct features",
                ));
            }
            key.clear();
            for c in rec.surface.chars() {
                key.push(c2i[c as usize]);
            }
            if rec.ti_prev != -1 {
                key.push(c2i[CP_MAX + 1 + rec.ti_prev as usize]);
            }
            *trie.update(&key) = Decision::pack(rec.shift, rec.ctype, pi).raw() as i32;
        }
        listing.flush()?;
        fs::write(stem.with_extension("da"), trie.to_bytes())?;

        // 素性文字列のブロブ。compactでは品詞部分を前詰めで共有する
        let mut fs_blob = Vec::new();
        let mut core_offsets = Vec::new();
        if cfg!(feature = "compact-dict") {
            for core in self.tbag.keys() {
                core_offsets.push(fs_blob.len() as u32);
                fs_blob.extend_from_slice(core.as_bytes());
            }
        }
        let mut feat_offsets = Vec::with_capacity(out_fbag.len());
        for feat in out_fbag.keys() {
            feat_offsets.push(fs_blob.len() as u32);
            fs_blob.extend_from_slice(feat.as_bytes());
        }
        fs::write(stem.with_extension("fs"), &fs_blob)?;

        let mut p2f = Vec::with_capacity(fsbag.len() * FeatureInfo::ENTRY_LEN);
        for id in 0..fsbag.len() {
            let &(ofi, ti) = fsbag.resolve(id);
            let core = self.tbag.resolve(ti);
            let feat = out_fbag.resolve(ofi);
            if core.len() >> MAX_FEATURE_BITS != 0 {
                return Err(StaccatoError::FeatureTooLong {
                    feature: core.clone(),
                    max: (1 << MAX_FEATURE_BITS) - 1,
                });
            }
            if feat.len() >> MAX_FEATURE_BITS != 0 {
                return Err(StaccatoError::FeatureTooLong {
                    feature: feat.clone(),
                    max: (1 << MAX_FEATURE_BITS) - 1,
                });
            }
            let info = FeatureInfo {
                ti: c2i.get(CP_MAX + 1 + ti).copied().unwrap_or(0),
                core_feat_len: core.len() as u16,
                feat_len: feat.len() as u16,
                core_feat_offset: core_offsets.get(ti).copied().unwrap_or(0),
                feat_offset: feat_offsets[ofi],
            };
            info.write_to(&mut p2f)?;
        }
        fs::write(stem.with_extension("p2f"), &p2f)?;
        eprintln!(" done.");
        Ok(())
    }
}

impl Default for PatternBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::tagger::Tagger;
    use std::io;

    const CORPUS_BASIC: &str = "本\t名詞,普通名詞,*,*,本,ほん\nが\t助詞,格助詞,*,*,が,が\nEOS\n";

    const CORPUS_KANA: &str = "アアア\t名詞,組織名,*,*,アアア,あああ\n\
                               アアア\t名詞,組織名,*,*,アアア,あああ\nEOS\n";

    const CORPUS_POS: &str = "あ\t感動詞,*,*,*,あ,あ\nた\t助動詞,*,*,*,た,た\nEOS\n\
                              あ\t感動詞,*,*,*,あ,あ\nた\t助動詞,*,*,*,た,た\nEOS\n\
                              本\t名詞,普通名詞,*,*,本,ほん\nた\t接尾辞,*,*,*,た,た\nEOS\n";

    fn build_model(corpus: &str, dicts: &[&str]) -> (tempfile::TempDir, Model) {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = PatternBuilder::new();
        let dicts: Vec<&[u8]> = dicts.iter().map(|d| d.as_bytes()).collect();
        builder.extract_from_readers(corpus.as_bytes(), dicts).unwrap();
        builder.write_patterns(dir.path()).unwrap();
        let model = Model::read(dir.path()).unwrap();
        (dir, model)
    }

    fn analyze(tagger: &Tagger, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        tagger.run(input, &mut out).unwrap();
        out
    }

    fn analyze_str(tagger: &Tagger, input: &str) -> String {
        String::from_utf8(analyze(tagger, input.as_bytes())).unwrap()
    }

    #[test]
    fn test_tagging_known_words() {
        let (_dir, model) = build_model(CORPUS_BASIC, &[]);
        let tagger = Tagger::new(model);
        assert_eq!(
            analyze_str(&tagger, "本が\n"),
            "本\t名詞,普通名詞,*,*,本,ほん\nが\t助詞,格助詞,*,*,が,が\nEOS\n"
        );
    }

    #[test]
    fn test_empty_input_and_bare_newline() {
        let (dir, model) = build_model(CORPUS_BASIC, &[]);
        let tagger = Tagger::new(model);
        assert_eq!(analyze_str(&tagger, ""), "");
        assert_eq!(analyze_str(&tagger, "\n"), "EOS\n");
        assert_eq!(analyze_str(&tagger, "\n\n"), "EOS\nEOS\n");

        let wakati = Tagger::new(Model::read(dir.path()).unwrap()).segmentation(true);
        assert_eq!(analyze_str(&wakati, ""), "");
        assert_eq!(analyze_str(&wakati, "\n"), "\n");
    }

    #[test]
    fn test_missing_trailing_newline_commits_pending_morpheme() {
        let (dir, model) = build_model(CORPUS_BASIC, &[]);
        let tagger = Tagger::new(model);
        assert_eq!(
            analyze_str(&tagger, "本が"),
            "本\t名詞,普通名詞,*,*,本,ほん\nが\t助詞,格助詞,*,*,が,が\nEOS\n"
        );
        let wakati = Tagger::new(Model::read(dir.path()).unwrap()).segmentation(true);
        assert_eq!(analyze_str(&wakati, "本が"), "本 が\n");
    }

    #[test]
    fn test_alpha_run_fuses_into_one_morpheme() {
        let (dir, model) = build_model(CORPUS_BASIC, &[]);
        let tagger = Tagger::new(model);
        assert_eq!(
            analyze_str(&tagger, "abc\n"),
            "abc\t名詞,普通名詞,*,*,*,*,*\nEOS\n"
        );
        let wakati = Tagger::new(Model::read(dir.path()).unwrap()).segmentation(true);
        assert_eq!(analyze_str(&wakati, "abc\n"), "abc\n");
    }

    #[test]
    fn test_num_run_fuses_into_one_morpheme() {
        let (dir, model) = build_model(CORPUS_BASIC, &[]);
        let tagger = Tagger::new(model);
        assert_eq!(
            analyze_str(&tagger, "123\n"),
            "123\t名詞,数詞,*,*,*,*,*\nEOS\n"
        );
        let wakati = Tagger::new(Model::read(dir.path()).unwrap()).segmentation(true);
        assert_eq!(analyze_str(&wakati, "123\n"), "123\n");
        // 全角や漢数字も数字として連結される
        assert_eq!(analyze_str(&wakati, "１２三\n"), "１２三\n");
    }

    #[test]
    fn test_alpha_and_num_runs_do_not_fuse_together() {
        let (dir, model) = build_model(CORPUS_BASIC, &[]);
        let wakati = Tagger::new(model).segmentation(true);
        assert_eq!(analyze_str(&wakati, "abc123\n"), "abc 123\n");
        // 空白はそれ自体が1つの形態素となり、区切りに挟まれて出力される
        assert_eq!(analyze_str(&wakati, "abc 123\n"), "abc   123\n");
        let _ = dir;
    }

    #[test]
    fn test_kana_fusion_within_limit() {
        let (dir, model) = build_model(CORPUS_KANA, &[]);
        let wakati = Tagger::new(model).segmentation(true);
        // 12バイトは1つに融合する
        assert_eq!(analyze_str(&wakati, "カタカナ\n"), "カタカナ\n");
        // 9バイト一致 + 3バイト一致 = 12 < 18 なので融合する
        assert_eq!(analyze_str(&wakati, "アアアア\n"), "アアアア\n");
        let _ = dir;
    }

    #[test]
    fn test_kana_fusion_limit_at_18_bytes() {
        let (dir, model) = build_model(CORPUS_KANA, &[]);
        let wakati = Tagger::new(model).segmentation(true);
        // 9バイト一致同士の合計が18に達すると融合しない
        assert_eq!(analyze_str(&wakati, "アアアアアア\n"), "アアア アアア\n");
        assert_eq!(
            analyze_str(&wakati, "アアアアアアアアア\n"),
            "アアア アアア アアア\n"
        );
        let tagger = Tagger::new(Model::read(dir.path()).unwrap());
        assert_eq!(
            analyze_str(&tagger, "アアアアアア\n"),
            "アアア\t名詞,組織名,*,*,アアア,あああ\nアアア\t名詞,組織名,*,*,アアア,あああ\nEOS\n"
        );
    }

    #[test]
    fn test_concatenated_morpheme_emits_core_feature() {
        let (_dir, model) = build_model(CORPUS_KANA, &[]);
        let tagger = Tagger::new(model);
        // 末尾の1文字一致が融合し、素性は品詞部分に ,*,*,* を続けた形になる
        assert_eq!(
            analyze_str(&tagger, "アアアア\n"),
            "アアアア\t名詞,組織名,*,*,*,*,*\nEOS\n"
        );
    }

    #[test]
    fn test_pos_refinement_overrides_surface_match() {
        let (_dir, model) = build_model(CORPUS_POS, &[]);
        let tagger = Tagger::new(model);
        // 「た」単体の多数決は助動詞だが、名詞の直後では接尾辞が優先される
        assert_eq!(
            analyze_str(&tagger, "本た\n"),
            "本\t名詞,普通名詞,*,*,本,ほん\nた\t接尾辞,*,*,*,た,た\nEOS\n"
        );
        assert_eq!(
            analyze_str(&tagger, "あた\n"),
            "あ\t感動詞,*,*,*,あ,あ\nた\t助動詞,*,*,*,た,た\nEOS\n"
        );
    }

    #[test]
    fn test_unknown_character_takes_pos_conditioned_feature() {
        let (_dir, model) = build_model(CORPUS_POS, &[]);
        let tagger = Tagger::new(model);
        // 「ぬ」は未学習。名詞の直後の未知語として観測された品詞が付く
        assert_eq!(
            analyze_str(&tagger, "本ぬ\n"),
            "本\t名詞,普通名詞,*,*,本,ほん\nぬ\t接尾辞,*,*,*,*,*,*\nEOS\n"
        );
        // 文頭の未知語には文頭で最も観測された品詞が付く
        assert_eq!(analyze_str(&tagger, "ぬ\n"), "ぬ\t感動詞,*,*,*,*,*,*\nEOS\n");
    }

    #[test]
    fn test_dictionary_words_are_seeded() {
        let dict = "京都,0,0,0,名詞,地名,*,*,京都,きょうと\n";
        let (_dir, model) = build_model(CORPUS_BASIC, &[dict]);
        let tagger = Tagger::new(model);
        assert_eq!(
            analyze_str(&tagger, "京都\n"),
            "京都\t名詞,地名,*,*,京都,きょうと\nEOS\n"
        );
    }

    #[test]
    fn test_quoted_dictionary_surface() {
        let dict = "\"a,b\",0,0,0,名詞,地名,*,*,*,*\n";
        let (_dir, model) = build_model(CORPUS_BASIC, &[dict]);
        let tagger = Tagger::new(model);
        assert_eq!(
            analyze_str(&tagger, "a,b\n"),
            "a,b\t名詞,地名,*,*,*,*\nEOS\n"
        );
    }

    #[test]
    fn test_invalid_utf8_does_not_crash() {
        let (_dir, model) = build_model(CORPUS_BASIC, &[]);
        let tagger = Tagger::new(model);
        for input in [&b"\xff"[..], &b"\xe3\x81\n"[..], &b"\x81\x40abc\n"[..]] {
            let out = analyze(&tagger, input);
            assert!(out.ends_with(b"EOS\n"), "input {input:?}");
        }
        // 壊れた列も表層としてはそのまま通過する
        let out = analyze(&tagger, b"\xff\n");
        assert!(out.starts_with(b"\xff"));
    }

    /// 素性付き出力から表層だけを取り出して連結します。
    fn surfaces_of(tagged: &str) -> String {
        let mut out = String::new();
        for line in tagged.split_inclusive('\n') {
            if line == "EOS\n" {
                out.push('\n');
            } else if let Some(tab) = line.find('\t') {
                out.push_str(&line[..tab]);
            }
        }
        out
    }

    /// 素性付き出力を分かち書きへ変換します。
    fn wakati_of(tagged: &str) -> String {
        let mut out = String::new();
        let mut first = true;
        for line in tagged.split_inclusive('\n') {
            if line == "EOS\n" {
                out.push('\n');
                first = true;
            } else if let Some(tab) = line.find('\t') {
                if !first {
                    out.push(' ');
                }
                out.push_str(&line[..tab]);
                first = false;
            }
        }
        out
    }

    #[test]
    fn test_surfaces_concatenate_back_to_input() {
        let (_dir, model) = build_model(CORPUS_BASIC, &[]);
        let tagger = Tagger::new(model);
        for input in ["本が\n", "abcカタカナ123。\n本が\n", "xyzぬ123\n"] {
            let tagged = analyze_str(&tagger, input);
            assert_eq!(surfaces_of(&tagged), input, "input {input:?}");
        }
    }

    #[test]
    fn test_segmentation_agrees_with_tagging() {
        let (dir, model) = build_model(CORPUS_POS, &[]);
        let tagger = Tagger::new(model);
        let wakati = Tagger::new(Model::read(dir.path()).unwrap()).segmentation(true);
        for input in ["本た\n", "あた123 xyz\n", "abc 123\nアアアアアア\n"] {
            let tagged = analyze_str(&tagger, input);
            let segmented = analyze_str(&wakati, input);
            assert_eq!(wakati_of(&tagged), segmented, "input {input:?}");
        }
    }

    /// 1回のreadで高々1バイトしか返さないリーダー
    struct Trickle<'a>(&'a [u8]);

    impl io::Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    /// 端末のように、1回のreadで高々1行しか返さないリーダー
    struct LineWise<'a>(&'a [u8]);

    impl io::Read for LineWise<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let upto = match self.0.iter().position(|&b| b == b'\n') {
                Some(at) => (at + 1).min(buf.len()),
                None => self.0.len().min(buf.len()),
            };
            buf[..upto].copy_from_slice(&self.0[..upto]);
            self.0 = &self.0[upto..];
            Ok(upto)
        }
    }

    #[test]
    fn test_output_is_independent_of_input_chunking() {
        let (dir, model) = build_model(CORPUS_POS, &[]);
        let tagger = Tagger::new(model);
        let input = "本たあた\nアアアアアア\n".as_bytes();
        let whole = analyze(&tagger, input);

        let mut trickled = Vec::new();
        tagger.run(Trickle(input), &mut trickled).unwrap();
        assert_eq!(trickled, whole);

        // 行単位で届く対話モードでも出力は変わらない
        let interactive = Tagger::new(Model::read(dir.path()).unwrap()).interactive(true);
        let mut out = Vec::new();
        interactive.run(LineWise(input), &mut out).unwrap();
        assert_eq!(out, whole);
    }

    #[test]
    fn test_corpus_line_without_tab_is_rejected() {
        let mut builder = PatternBuilder::new();
        let corpus = "本 名詞,普通名詞,*,*\nEOS\n";
        let err = builder
            .extract_from_readers(corpus.as_bytes(), Vec::<&[u8]>::new())
            .unwrap_err();
        assert!(matches!(err, StaccatoError::InvalidFormat { .. }));
    }

    #[test]
    fn test_overlong_token_is_rejected() {
        let mut builder = PatternBuilder::new();
        let corpus = format!("{}\t名詞,普通名詞,*,*\nEOS\n", "a".repeat(130));
        let err = builder
            .extract_from_readers(corpus.as_bytes(), Vec::<&[u8]>::new())
            .unwrap_err();
        assert!(matches!(err, StaccatoError::PatternTooLong { .. }));
    }

    #[test]
    fn test_short_dictionary_row_is_rejected() {
        let mut builder = PatternBuilder::new();
        let err = builder
            .extract_from_readers(CORPUS_BASIC.as_bytes(), vec!["京都,0,0".as_bytes()])
            .unwrap_err();
        assert!(matches!(err, StaccatoError::InvalidFormat { .. }));
    }

    #[test]
    fn test_overlong_feature_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = PatternBuilder::new();
        let corpus = format!("本\t名詞,普通名詞,*,*,{}\nEOS\n", "ほ".repeat(200));
        builder
            .extract_from_readers(corpus.as_bytes(), Vec::<&[u8]>::new())
            .unwrap();
        let err = builder.write_patterns(dir.path()).unwrap_err();
        assert!(matches!(err, StaccatoError::FeatureTooLong { .. }));
    }

    #[test]
    fn test_pattern_listing_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = PatternBuilder::new();
        builder
            .extract_from_readers(CORPUS_BASIC.as_bytes(), Vec::<&[u8]>::new())
            .unwrap();
        builder.write_patterns(dir.path()).unwrap();
        let listing = fs::read_to_string(dir.path().join("patterns")).unwrap();
        assert!(listing.lines().any(|l| l.contains("本")));
        for ext in ["c2i", "da", "p2f", "fs"] {
            assert!(dir.path().join("patterns").with_extension(ext).exists());
        }
    }
}
