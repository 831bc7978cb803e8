//! 解析ループ用の固定長入出力バッファ
//!
//! 入力側は未消費の末尾を先頭へ詰め直してから読み足すリングバッファ、
//! 出力側は明示的なフラッシュを持つ書き込みバッファです。どちらも
//! バッファ長は [`BUF_SIZE`] で固定です。

use std::io::{self, Read, Write};

/// 入出力バッファのバイト数
pub const BUF_SIZE: usize = 1 << 17;

/// 詰め直し方式の入力バッファ
///
/// 読み足しには2つの方法があります。[`fill`](Self::fill) はバッファが
/// 満ちるか入力が尽きるまで読み続けるため、上流がどんな粒度でバイトを
/// 渡しても解析の窓は変わりません。[`read_more`](Self::read_more) は
/// 1回だけ読み、端末のような行単位の入力を待つのに使います。
pub struct StreamReader<R> {
    src: R,
    buf: Box<[u8]>,
    head: usize,
    tail: usize,
    eof: bool,
}

impl<R: Read> StreamReader<R> {
    /// 空のバッファを作ります。最初の読み込みは行いません。
    pub fn new(src: R) -> Self {
        Self {
            src,
            buf: vec![0; BUF_SIZE].into_boxed_slice(),
            head: 0,
            tail: 0,
            eof: false,
        }
    }

    /// 未消費のバイト列を先頭へ詰め直し、バッファが満ちるか入力が
    /// 尽きるまで読み足します。
    pub fn fill(&mut self) -> io::Result<()> {
        self.compact();
        while !self.eof && self.tail < self.buf.len() {
            match self.src.read(&mut self.buf[self.tail..]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.tail += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// 未消費のバイト列を先頭へ詰め直し、1回だけ読み足します。
    pub fn read_more(&mut self) -> io::Result<()> {
        self.compact();
        while !self.eof && self.tail < self.buf.len() {
            match self.src.read(&mut self.buf[self.tail..]) {
                Ok(0) => self.eof = true,
                Ok(n) => {
                    self.tail += n;
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn compact(&mut self) {
        self.buf.copy_within(self.head..self.tail, 0);
        self.tail -= self.head;
        self.head = 0;
    }

    /// 未消費のバイト列を返します。
    #[inline(always)]
    pub fn window(&self) -> &[u8] {
        &self.buf[self.head..self.tail]
    }

    /// 未消費のバイトが無いかどうかを返します。
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// 少なくとも `n` バイト読めるかどうかを返します。
    #[inline(always)]
    pub fn readable(&self, n: usize) -> bool {
        self.head + n <= self.tail
    }

    /// カーソルを `n` バイト進めます。
    #[inline(always)]
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.head + n <= self.tail);
        self.head += n;
    }
}

/// 明示的なフラッシュを持つ出力バッファ
///
/// 書き込みがバッファに収まらない場合は透過的にフラッシュします。
pub struct StreamWriter<W: Write> {
    dst: W,
    buf: Vec<u8>,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(dst: W) -> Self {
        Self {
            dst,
            buf: Vec::with_capacity(BUF_SIZE),
        }
    }

    /// バイト列をバッファへ書き足します。
    pub fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.buf.len() + bytes.len() > BUF_SIZE {
            self.drain()?;
            if bytes.len() > BUF_SIZE {
                return self.dst.write_all(bytes);
            }
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// あと `n` バイトをフラッシュなしで書けるかどうかを返します。
    #[inline(always)]
    pub fn writable(&self, n: usize) -> bool {
        self.buf.len() + n <= BUF_SIZE
    }

    /// バッファを出力先へ吐き出し、出力先もフラッシュします。
    pub fn flush(&mut self) -> io::Result<()> {
        self.drain()?;
        self.dst.flush()
    }

    fn drain(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.dst.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl<W: Write> Drop for StreamWriter<W> {
    fn drop(&mut self) {
        let _ = self.drain();
    }
}
