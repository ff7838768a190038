use crate::facets::TileFacets;

pub const VISITED_COLOR: &str = "blue";
pub const UNVISITED_COLOR: &str = "red";
pub const ALERT_COLOR: &str = "orange";

pub const THIN_WEIGHT: f64 = 0.1;
pub const BOLD_WEIGHT: f64 = 1.0;

pub const ERROR_OPACITY: f64 = 0.7;
pub const SELECTED_OPACITY: f64 = 0.2;
pub const HIGHLIGHTED_OPACITY: f64 = 0.1;

/// Rectangle style pushed to the map widget for one tile.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileStyle {
    pub border_color: &'static str,
    pub border_weight: f64,
    pub fill_color: &'static str,
    pub fill_opacity: f64,
}

impl TileStyle {
    /// Pure function of the facets: independent of evaluation order and
    /// stable under re-application.
    pub fn compose(facets: &TileFacets) -> Self {
        let (border_color, border_weight) = if facets.progress.is_visited() {
            (VISITED_COLOR, THIN_WEIGHT)
        } else {
            (UNVISITED_COLOR, BOLD_WEIGHT)
        };

        let mut fill_color = border_color;
        let mut fill_opacity = 0.0;
        if facets.error {
            fill_color = ALERT_COLOR;
            fill_opacity += ERROR_OPACITY;
        }
        if facets.selected {
            fill_opacity += SELECTED_OPACITY;
        }
        if facets.highlighted {
            fill_opacity += HIGHLIGHTED_OPACITY;
        }

        Self {
            border_color,
            border_weight,
            fill_color,
            fill_opacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facets::{Progress, TileFacets};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {a} ~= {b}");
    }

    #[test]
    fn default_tile_is_transparent_with_bold_red_border() {
        let s = TileStyle::compose(&TileFacets::default());
        assert_eq!(s.border_color, UNVISITED_COLOR);
        assert_eq!(s.border_weight, BOLD_WEIGHT);
        assert_eq!(s.fill_opacity, 0.0);
    }

    #[test]
    fn visited_tile_gets_thin_default_border() {
        let s = TileStyle::compose(&TileFacets {
            progress: Progress::Visited,
            ..TileFacets::default()
        });
        assert_eq!(s.border_color, VISITED_COLOR);
        assert_eq!(s.border_weight, THIN_WEIGHT);
        assert_eq!(s.fill_color, VISITED_COLOR);
    }

    #[test]
    fn missing_tile_is_drawn_like_unvisited() {
        let s = TileStyle::compose(&TileFacets {
            progress: Progress::Missing,
            ..TileFacets::default()
        });
        assert_eq!(s.border_color, UNVISITED_COLOR);
        assert_eq!(s.border_weight, BOLD_WEIGHT);
    }

    #[test]
    fn opacities_add_up() {
        let f = TileFacets {
            selected: true,
            progress: Progress::Visited,
            error: true,
            highlighted: true,
        };
        let s = TileStyle::compose(&f);
        assert_eq!(s.fill_color, ALERT_COLOR);
        assert_close(s.fill_opacity, 1.0);

        let s = TileStyle::compose(&TileFacets {
            selected: true,
            highlighted: true,
            ..TileFacets::default()
        });
        assert_close(s.fill_opacity, 0.3);
    }

    #[test]
    fn composition_is_idempotent_for_every_facet_combination() {
        for bits in 0..16u8 {
            let f = TileFacets {
                selected: bits & 1 != 0,
                progress: if bits & 2 != 0 {
                    Progress::Visited
                } else {
                    Progress::Unvisited
                },
                error: bits & 4 != 0,
                highlighted: bits & 8 != 0,
            };
            assert_eq!(TileStyle::compose(&f), TileStyle::compose(&f));
        }
    }
}
