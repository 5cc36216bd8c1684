//! Framebuffer of styled character cells.

use crate::types::{Cell, CellStyle};

/// 2D framebuffer of styled character cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            cells: vec![Cell::default(); len],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Resize, keeping the allocation when possible.
    pub fn resize(&mut self, width: u16, height: u16) {
        if self.width == width && self.height == height {
            return;
        }
        self.width = width;
        self.height = height;
        let len = (width as usize) * (height as usize);
        self.cells.resize(len, Cell::default());
    }

    #[inline(always)]
    fn idx(&self, x: u16, y: u16) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize) * (self.width as usize) + (x as usize))
    }

    pub fn get(&self, x: u16, y: u16) -> Option<Cell> {
        self.idx(x, y).map(|i| self.cells[i])
    }

    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if let Some(i) = self.idx(x, y) {
            self.cells[i] = cell;
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    pub fn put_str(&mut self, x: u16, y: u16, s: &str, style: CellStyle) {
        for (dx, ch) in s.chars().enumerate() {
            let Some(cx) = u16::try_from(dx).ok().and_then(|dx| x.checked_add(dx)) else {
                break;
            };
            if cx >= self.width {
                break;
            }
            self.set(cx, y, style.into_cell(ch));
        }
    }

    /// Copy already styled cells, clipped at the right edge.
    pub fn put_cells(&mut self, x: u16, y: u16, cells: &[Cell]) {
        for (dx, cell) in cells.iter().enumerate() {
            let Some(cx) = u16::try_from(dx).ok().and_then(|dx| x.checked_add(dx)) else {
                break;
            };
            if cx >= self.width {
                break;
            }
            self.set(cx, y, *cell);
        }
    }

    /// Text of one row, mostly for tests.
    pub fn row_text(&self, y: u16) -> String {
        (0..self.width)
            .filter_map(|x| self.get(x, y))
            .map(|cell| cell.ch)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;

    #[test]
    fn test_put_str_clips_at_edge() {
        let mut fb = FrameBuffer::new(4, 1);
        fb.put_str(2, 0, "abc", CellStyle::default());
        assert_eq!(fb.row_text(0), "  ab");
    }

    #[test]
    fn test_put_cells_keeps_styles() {
        let mut fb = FrameBuffer::new(3, 2);
        let red = CellStyle::bg(Color::Red).into_cell(' ');
        fb.put_cells(1, 1, &[red, red]);
        assert_eq!(fb.get(1, 1), Some(red));
        assert_eq!(fb.get(0, 1), Some(Cell::default()));
        assert_eq!(fb.get(3, 1), None);
    }

    #[test]
    fn test_resize_then_clear() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.put_str(0, 0, "xy", CellStyle::default());
        fb.resize(3, 1);
        fb.clear();
        assert_eq!(fb.row_text(0), "   ");
        assert_eq!(fb.height(), 1);
    }
}
