//! Searches over a sector's neighbours, used to pick mover destinations
//! and light bounds.

use super::Level;
use crate::math::Fixed;

/// Only this many higher neighbours are considered by
/// [`Level::next_highest_floor`].
const MAX_ADJOINING_SECTORS: usize = 20;

impl Level {
    /// The sector on the other side of `line` from `sector`, if the line
    /// is flagged two-sided.
    #[must_use]
    pub fn next_sector(&self, line: usize, sector: usize) -> Option<usize> {
        let line = &self.lines[line];
        if !line.is_two_sided() {
            return None;
        }
        if line.front_sector == sector {
            line.back_sector
        } else {
            Some(line.front_sector)
        }
    }

    fn neighbours(&self, sector: usize) -> impl Iterator<Item = usize> + '_ {
        self.sectors[sector]
            .lines
            .iter()
            .filter_map(move |&line| self.next_sector(line, sector))
    }

    /// Lowest floor among the sector and its neighbours.
    #[must_use]
    pub fn lowest_floor_surrounding(&self, sector: usize) -> Fixed {
        let mut floor = self.sectors[sector].floor_height;
        for other in self.neighbours(sector) {
            if self.sectors[other].floor_height < floor {
                floor = self.sectors[other].floor_height;
            }
        }
        floor
    }

    /// Highest neighbouring floor, or -500 when nothing is higher.
    #[must_use]
    pub fn highest_floor_surrounding(&self, sector: usize) -> Fixed {
        let mut floor = Fixed::from_int(-500);
        for other in self.neighbours(sector) {
            if self.sectors[other].floor_height > floor {
                floor = self.sectors[other].floor_height;
            }
        }
        floor
    }

    /// Lowest neighbouring floor above `current`, or `current` itself.
    #[must_use]
    pub fn next_highest_floor(&self, sector: usize, current: Fixed) -> Fixed {
        self.neighbours(sector)
            .map(|other| self.sectors[other].floor_height)
            .filter(|&height| height > current)
            .take(MAX_ADJOINING_SECTORS)
            .min()
            .unwrap_or(current)
    }

    /// Lowest neighbouring ceiling, or [`Fixed::MAX`] with no neighbours.
    #[must_use]
    pub fn lowest_ceiling_surrounding(&self, sector: usize) -> Fixed {
        let mut height = Fixed::MAX;
        for other in self.neighbours(sector) {
            if self.sectors[other].ceiling_height < height {
                height = self.sectors[other].ceiling_height;
            }
        }
        height
    }

    /// Highest neighbouring ceiling, never below zero.
    #[must_use]
    pub fn highest_ceiling_surrounding(&self, sector: usize) -> Fixed {
        let mut height = Fixed::ZERO;
        for other in self.neighbours(sector) {
            if self.sectors[other].ceiling_height > height {
                height = self.sectors[other].ceiling_height;
            }
        }
        height
    }

    /// Darkest neighbouring light level, capped at `max`.
    #[must_use]
    pub fn min_surrounding_light(&self, sector: usize, max: i16) -> i16 {
        let mut min = max;
        for other in self.neighbours(sector) {
            if self.sectors[other].light_level < min {
                min = self.sectors[other].light_level;
            }
        }
        min
    }

    /// First sector after `after` whose tag is `tag`.
    ///
    /// Pass `None` to start from the beginning.
    #[must_use]
    pub fn next_tagged_sector(&self, tag: i16, after: Option<usize>) -> Option<usize> {
        let start = after.map_or(0, |s| s + 1);
        (start..self.sectors.len()).find(|&s| self.sectors[s].tag == tag)
    }
}

#[cfg(test)]
mod tests {
    use crate::fixtures::RoomChain;

    use super::*;

    fn level(chain: RoomChain) -> Level {
        Level::build(&chain.build()).unwrap().0
    }

    #[test]
    fn test_neighbour_heights() {
        let lvl = level(
            RoomChain::new()
                .room(0, 128)
                .room(24, 96)
                .room(-16, 200)
                .room(64, 128),
        );
        assert_eq!(lvl.lowest_floor_surrounding(1), Fixed::from_int(-16));
        assert_eq!(lvl.highest_floor_surrounding(1), Fixed::ZERO);
        assert_eq!(lvl.next_highest_floor(2, Fixed::from_int(-16)), Fixed::from_int(24));
        assert_eq!(lvl.next_highest_floor(2, Fixed::from_int(100)), Fixed::from_int(100));
        assert_eq!(lvl.lowest_ceiling_surrounding(2), Fixed::from_int(96));
        assert_eq!(lvl.highest_ceiling_surrounding(2), Fixed::from_int(128));
    }

    #[test]
    fn test_end_rooms_have_one_neighbour() {
        let lvl = level(RoomChain::new().room(0, 128).room(8, 128));
        assert_eq!(lvl.highest_floor_surrounding(0), Fixed::from_int(8));
        assert_eq!(lvl.lowest_floor_surrounding(0), Fixed::ZERO);
        assert_eq!(lvl.next_sector(lvl.sectors[0].lines[0], 0), None);
    }

    #[test]
    fn test_lone_room_defaults() {
        let lvl = level(RoomChain::new().room(0, 128));
        assert_eq!(lvl.highest_floor_surrounding(0), Fixed::from_int(-500));
        assert_eq!(lvl.lowest_ceiling_surrounding(0), Fixed::MAX);
        assert_eq!(lvl.highest_ceiling_surrounding(0), Fixed::ZERO);
        assert_eq!(lvl.min_surrounding_light(0, 200), 200);
    }

    #[test]
    fn test_min_surrounding_light() {
        let lvl = level(
            RoomChain::new()
                .room(0, 128)
                .light(96)
                .room(0, 128)
                .light(200)
                .room(0, 128)
                .light(40),
        );
        assert_eq!(lvl.min_surrounding_light(1, 200), 40);
        assert_eq!(lvl.min_surrounding_light(0, 96), 96);
    }

    #[test]
    fn test_tag_search_order() {
        let lvl = level(
            RoomChain::new()
                .room(0, 128)
                .tag(3)
                .room(0, 128)
                .room(0, 128)
                .tag(3),
        );
        assert_eq!(lvl.next_tagged_sector(3, None), Some(0));
        assert_eq!(lvl.next_tagged_sector(3, Some(0)), Some(2));
        assert_eq!(lvl.next_tagged_sector(3, Some(2)), None);
        assert_eq!(lvl.next_tagged_sector(9, None), None);
    }
}
