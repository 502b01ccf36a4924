use super::attributes::CharAttributes;
use super::character::{CHARACTER_SIZE, Character};
use super::pixel;
use super::{NUM_CHARACTERS, PLANE_COLUMNS, PLANE_ROWS, SCREEN_WIDTH};

/// Planes are 256x256 pixel surfaces that wrap in both directions.
pub const PLANE_PIXEL_MASK: usize = PLANE_COLUMNS * CHARACTER_SIZE - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Cell {
    pub character: u8,
    pub attr: CharAttributes,
}

impl Cell {
    pub const EMPTY: Self = Self {
        character: 0,
        attr: CharAttributes::from_bits(0),
    };

    pub const fn new(character: u8, attr: CharAttributes) -> Self {
        Self { character, attr }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    cells: [[Cell; PLANE_COLUMNS]; PLANE_ROWS],
}

impl Default for Plane {
    fn default() -> Self {
        Self::new()
    }
}

impl Plane {
    pub const fn new() -> Self {
        Self {
            cells: [[Cell::EMPTY; PLANE_COLUMNS]; PLANE_ROWS],
        }
    }

    /// Cell lookup; row and column wrap modulo the plane size.
    pub fn cell(&self, row: usize, column: usize) -> Cell {
        self.cells[row % PLANE_ROWS][column % PLANE_COLUMNS]
    }

    pub fn cell_mut(&mut self, row: usize, column: usize) -> &mut Cell {
        &mut self.cells[row % PLANE_ROWS][column % PLANE_COLUMNS]
    }

    pub fn set_cell(&mut self, row: usize, column: usize, cell: Cell) {
        *self.cell_mut(row, column) = cell;
    }

    pub fn fill(&mut self, cell: Cell) {
        for row in self.cells.iter_mut() {
            row.fill(cell);
        }
    }

    pub fn clear(&mut self) {
        self.fill(Cell::EMPTY);
    }
}

/// Composites one plane into `scanline` for screen line `y`.
///
/// A non-transparent pixel replaces the incumbent byte when its priority is
/// greater than or equal to the incumbent's, so a plane drawn later wins
/// ties. `pixel_flag` is OR-ed into every written byte.
pub fn render_plane(
    characters: &[Character; NUM_CHARACTERS],
    plane: &Plane,
    y: usize,
    scroll_x: u16,
    scroll_y: u16,
    pixel_flag: u8,
    scanline: &mut [u8; SCREEN_WIDTH],
) {
    let plane_y = (y + usize::from(scroll_y)) & PLANE_PIXEL_MASK;
    let row = plane_y / CHARACTER_SIZE;
    let cell_y = plane_y % CHARACTER_SIZE;

    for (x, dest) in scanline.iter_mut().enumerate() {
        let plane_x = (x + usize::from(scroll_x)) & PLANE_PIXEL_MASK;
        let cell = plane.cell(row, plane_x / CHARACTER_SIZE);
        if cell.attr.priority() < pixel::priority(*dest) {
            continue;
        }

        let cell_x = plane_x % CHARACTER_SIZE;
        let px = if cell.attr.flip_x() { 7 - cell_x } else { cell_x };
        let py = if cell.attr.flip_y() { 7 - cell_y } else { cell_y };
        let value = characters[usize::from(cell.character)].pixel(px, py);
        if value != 0 {
            *dest = cell.attr.scanline_byte(value) | pixel_flag;
        }
    }
}
