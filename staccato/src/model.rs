//! コンパイル済みパターンモデルの読み込み
//!
//! モデルは4つのアーティファクトから成ります。いずれもヘッダを持たない
//! リトルエンディアンの平坦な配列で、長さはファイルサイズから決まります。
//!
//! - `patterns.c2i` - コードポイントからトライのキーidへの写像 (`u16` 配列)
//! - `patterns.da`  - ダブル配列トライ
//! - `patterns.p2f` - 素性idから素性情報への配列
//! - `patterns.fs`  - 素性文字列ブロブ
//!
//! 各ファイルは読み取り専用でメモリマップされ、[`Model`] の生存期間中
//! 保持されます。マップ領域は変更されないため、複数の解析器から参照で
//! 共有できます。

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::character::CP_MAX;
use crate::errors::{Result, StaccatoError};
use crate::record::FeatureInfo;
use crate::trie::Trie;

/// アーティファクトのファイル名の接頭辞
pub(crate) const ARTIFACT_STEM: &str = "patterns";

/// 解析時に参照するアーティファクト一式
#[derive(Debug)]
pub struct Model {
    da: Mmap,
    c2i: Mmap,
    p2f: Mmap,
    fs: Mmap,
}

impl Model {
    /// ディレクトリからモデルを読み込みます。
    ///
    /// # 引数
    ///
    /// * `dir` - アーティファクトを格納したディレクトリ
    ///
    /// # エラー
    ///
    /// いずれかのアーティファクトが開けない場合、
    /// [`StaccatoError::ModelMissing`] を返します。
    pub fn read<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let stem = dir.as_ref().join(ARTIFACT_STEM);
        Ok(Self {
            da: Self::map_artifact(stem.with_extension("da"))?,
            c2i: Self::map_artifact(stem.with_extension("c2i"))?,
            p2f: Self::map_artifact(stem.with_extension("p2f"))?,
            fs: Self::map_artifact(stem.with_extension("fs"))?,
        })
    }

    fn map_artifact(path: PathBuf) -> Result<Mmap> {
        let file = File::open(&path).map_err(|source| StaccatoError::ModelMissing {
            path: path.clone(),
            source,
        })?;
        // マップ中のファイルが外部から書き換えられないことが前提
        unsafe { Mmap::map(&file) }.map_err(|source| StaccatoError::ModelMissing { path, source })
    }

    /// トライのビューを返します。
    #[inline(always)]
    pub(crate) fn trie(&self) -> Trie<'_> {
        Trie::new(&self.da)
    }

    /// コードポイント写像のビューを返します。
    #[inline(always)]
    pub(crate) fn code_map(&self) -> CodeMap<'_> {
        CodeMap(&self.c2i)
    }

    /// 素性idに対応する素性情報を返します。
    #[inline(always)]
    pub(crate) fn feature_info(&self, id: usize) -> FeatureInfo {
        FeatureInfo::read(&self.p2f, id)
    }

    /// 素性文字列ブロブを返します。
    #[inline(always)]
    pub(crate) fn feature_strings(&self) -> &[u8] {
        &self.fs
    }
}

/// コードポイントからトライのキーidへの写像ビュー
///
/// id 0 は「未知」を表し、トライの走査を必ず失敗させます。インデックス
/// `CP_MAX + 1` は文頭の疑似コードポイントです。
#[derive(Clone, Copy)]
pub struct CodeMap<'a>(pub(crate) &'a [u8]);

impl CodeMap<'_> {
    /// コードポイントのキーidを返します。表の外は0です。
    #[inline(always)]
    pub fn id(&self, cp: usize) -> u16 {
        let at = cp * 2;
        if at + 2 > self.0.len() {
            return 0;
        }
        u16::from_le_bytes([self.0[at], self.0[at + 1]])
    }

    /// 文頭の疑似コードポイントのidを返します。
    #[inline(always)]
    pub fn bos(&self) -> u16 {
        self.id(CP_MAX + 1)
    }
}
