// urlnav codecs
// Codecs convert between bookmark trees and their on-disk documents. They build
// fresh `Folder` values and never touch the live tree.

pub mod html;
pub mod json_codec;
