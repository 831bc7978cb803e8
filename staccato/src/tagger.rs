//! パターンマッチによる解析の実行時ループ
//!
//! 入力ストリームを先頭から走査し、最長一致のパターンが指示するバイト数
//! ずつ形態素を切り出します。直前の形態素と文字種が揃う場合は1つの形態素
//! へ連結し、確定した形態素には素性文字列を付けて出力します。

use std::io::{self, Read, Write};

use crate::character::{ctype, u8_len};
use crate::io::{StreamReader, StreamWriter};
use crate::model::Model;
use crate::record::{Decision, FeatureInfo, MAX_FEATURE_BITS, MAX_PATTERN_BITS};
use crate::errors::Result;

/// カタカナ同士を連結してよい、隣接する一致幅の合計バイト数の上限
const KANA_CONCAT_LIMIT: usize = 18;

/// パターンマッチに基づく形態素解析器
///
/// # 使用例
///
/// ```ignore
/// let tagger = Tagger::new(model).segmentation(false).interactive(false);
/// tagger.run(std::io::stdin().lock(), std::io::stdout().lock())?;
/// ```
pub struct Tagger {
    model: Model,
    segmentation: bool,
    interactive: bool,
}

impl Tagger {
    /// モデルから解析器を作ります。
    pub fn new(model: Model) -> Self {
        Self {
            model,
            segmentation: false,
            interactive: false,
        }
    }

    /// 素性を出力せず、空白区切りの分かち書きだけを行います。
    #[must_use]
    pub fn segmentation(mut self, yes: bool) -> Self {
        self.segmentation = yes;
        self
    }

    /// 文ごとに出力をフラッシュする行バッファリングモードにします。
    ///
    /// 標準入力が端末の場合に指定すると、文単位の対話的な応答になります。
    #[must_use]
    pub fn interactive(mut self, yes: bool) -> Self {
        self.interactive = yes;
        self
    }

    /// 確定した形態素の素性文字列を書き出します。
    ///
    /// 連結された形態素は語彙情報を持たないため、品詞部分に `,*,*,*` を
    /// 続けた形で出力します。素性文字列は先頭のタブと末尾の改行を含んで
    /// ブロブに格納されています。
    fn write_feature<W: Write>(
        &self,
        writer: &mut StreamWriter<W>,
        concat: bool,
        finfo: FeatureInfo,
    ) -> io::Result<()> {
        let fs = self.model.feature_strings();
        if cfg!(feature = "compact-dict") {
            let at = finfo.core_feat_offset as usize;
            writer.write(&fs[at..at + usize::from(finfo.core_feat_len)])?;
        }
        if concat {
            if !cfg!(feature = "compact-dict") {
                let at = finfo.feat_offset as usize;
                writer.write(&fs[at..at + usize::from(finfo.core_feat_len)])?;
            }
            writer.write(b",*,*,*\n")
        } else {
            let at = finfo.feat_offset as usize;
            writer.write(&fs[at..at + usize::from(finfo.feat_len)])
        }
    }

    /// 入力ストリームを解析し、結果を出力ストリームへ書き込みます。
    ///
    /// 改行は文境界として扱われ、素性付きモードでは `EOS` 行、分かち書き
    /// モードでは改行がそのまま出力されます。出力バイト列から素性・区切り
    /// 文字・`EOS` を取り除くと、入力バイト列がそのまま復元できます。
    pub fn run<R: Read, W: Write>(&self, input: R, output: W) -> Result<()> {
        let trie = self.model.trie();
        let c2i = self.model.code_map();
        let bos = c2i.bos();
        let tagging = !self.segmentation;

        let mut reader = StreamReader::new(input);
        if self.interactive {
            // 端末からは行単位でしか届かないため、1回の読み込みだけ待つ
            reader.read_more()?;
        } else {
            reader.fill()?;
        }
        let mut writer = StreamWriter::new(output);
        let mut prev = Decision::default();
        let mut cur = Decision::default();
        let mut finfo = FeatureInfo::bos(bos);

        while !reader.is_empty() {
            if reader.window()[0] == b'\n' {
                if prev.raw() != 0 && tagging {
                    self.write_feature(&mut writer, prev.concat(), finfo)?;
                }
                writer.write(if tagging { b"EOS\n" } else { b"\n" })?;
                cur.set_shift(1);
                prev = Decision::default();
                finfo = FeatureInfo::bos(bos);
                if self.interactive {
                    writer.flush()?;
                }
            } else {
                cur = Decision::from_raw(trie.longest_pattern_search(
                    reader.window(),
                    finfo.ti,
                    &c2i,
                ));
                if cur.shift() == 0 {
                    // 一致なし。1文字分を未知語として進める
                    cur.set_shift(u8_len(reader.window()[0]).min(reader.window().len()));
                }
                if prev.raw() != 0 {
                    let concat = prev.ctype() == cur.ctype()
                        && prev.ctype() != ctype::OTHER
                        && (prev.ctype() != ctype::KANA
                            || prev.shift() + cur.shift() < KANA_CONCAT_LIMIT);
                    cur.set_concat(concat);
                    if !concat {
                        // 保留中の形態素を確定する。表層は出力済み
                        if tagging {
                            self.write_feature(&mut writer, prev.concat(), finfo)?;
                        } else {
                            writer.write(b" ")?;
                        }
                    }
                }
                finfo = self.model.feature_info(cur.id());
                writer.write(&reader.window()[..cur.shift()])?;
                prev = cur;
            }
            reader.advance(cur.shift());
            if !self.interactive && !writer.writable(1 << MAX_FEATURE_BITS) {
                writer.flush()?;
            }
            if self.interactive {
                if reader.is_empty() {
                    reader.read_more()?;
                }
            } else if !reader.readable(1 << MAX_PATTERN_BITS) {
                reader.fill()?;
            }
        }
        if prev.raw() != 0 {
            if tagging {
                self.write_feature(&mut writer, prev.concat(), finfo)?;
            }
            writer.write(if tagging { b"EOS\n" } else { b"\n" })?;
        }
        writer.flush()?;
        Ok(())
    }
}
