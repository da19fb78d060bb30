//! Prompt templates for DEF synthesis.
//!
//! Every request carries three system blocks (technology, syntax, target)
//! followed by either the initial prompt or a feedback prompt built from the
//! last rejected candidate.

use std::path::{Path, PathBuf};

use crate::domain::errors::{SynthesisError, SynthesisResult};

const DEF_SYNTAX: &str = r#"A valid design is a DEF 5.8 file. Statements and sections appear in this order, each one optional unless noted:

VERSION, DIVIDERCHAR, BUSBITCHARS, DESIGN (required), UNITS, PROPERTYDEFINITIONS, DIEAREA, ROW..., TRACKS..., GCELLGRID..., VIAS, NONDEFAULTRULES, REGIONS, COMPONENTMASKSHIFT, COMPONENTS, PINS, PINPROPERTIES, BLOCKAGES, FILLS, SPECIALNETS, NETS, SCANCHAINS, GROUPS, END DESIGN (required).

Statement forms (listed alphabetically, not in file order):

BLOCKAGES n ;
  [- LAYER layer [+ SLOTS | + FILLS] [+ PUSHDOWN] [+ EXCEPTPGNET] [+ COMPONENT comp]
      [+ SPACING s | + DESIGNRULEWIDTH w] {RECT pt pt | POLYGON pt pt pt ...} ... ;] ...
  [- PLACEMENT [+ SOFT | + PARTIAL density] [+ PUSHDOWN] [+ COMPONENT comp] {RECT pt pt} ... ;] ...
END BLOCKAGES

BUSBITCHARS "pair" ;
COMPONENTMASKSHIFT layer [layer ...] ;

COMPONENTS n ;
  [- comp model [+ SOURCE {NETLIST | DIST | USER | TIMING}]
      [+ {FIXED pt orient | COVER pt orient | PLACED pt orient | UNPLACED}]
      [+ HALO [SOFT] left bottom right top] [+ WEIGHT w] [+ REGION region]
      [+ PROPERTY {name value} ...] ... ;] ...
END COMPONENTS

DESIGN name ;
DIEAREA pt pt [pt] ... ;
DIVIDERCHAR "c" ;

FILLS n ;
  [- LAYER layer [+ MASK m] [+ OPC] {RECT pt pt} ... ;] ...
END FILLS

GCELLGRID {X | Y} start DO count STEP space ;

GROUPS n ;
  [- group [pattern ...] [+ REGION region] [+ PROPERTY {name value} ...] ... ;] ...
END GROUPS

NETS n ;
  [- net [( {comp pin | PIN pin} [+ SYNTHESIZED] )] ...
      [+ NONDEFAULTRULE rule]
      [{+ COVER | + FIXED | + ROUTED | + NOSHIELD} layer [TAPER | TAPERRULE rule] [STYLE s] routingPoints
        [NEW layer [TAPER | TAPERRULE rule] [STYLE s] routingPoints] ...] ...
      [+ SOURCE {DIST | NETLIST | TEST | TIMING | USER}] [+ FIXEDBUMP]
      [+ USE {ANALOG | CLOCK | GROUND | POWER | RESET | SCAN | SIGNAL | TIEOFF}]
      [+ WEIGHT w] [+ PROPERTY {name value} ...] ... ;] ...
END NETS

NONDEFAULTRULES n ;
  {- rule [+ HARDSPACING] {+ LAYER layer WIDTH w [SPACING s] [WIREEXT e]} ...
      [+ VIA via] ... [+ VIARULE viaRule] ... [+ MINCUTS cutLayer cuts] ...
      [+ PROPERTY {name value} ...] ... ;} ...
END NONDEFAULTRULES

PINS n ;
  [- pin + NET net [+ SPECIAL] [+ DIRECTION {INPUT | OUTPUT | INOUT | FEEDTHRU}]
      [+ SUPPLYSENSITIVITY pin] [+ GROUNDSENSITIVITY pin]
      [+ USE {SIGNAL | POWER | GROUND | CLOCK | TIEOFF | ANALOG | SCAN | RESET}]
      [[+ PORT] [+ LAYER layer [MASK m] [SPACING s | DESIGNRULEWIDTH w] pt pt] ...
       [+ COVER pt orient | FIXED pt orient | PLACED pt orient]] ... ;] ...
END PINS

PINPROPERTIES n ;
  [- {comp pin | PIN pin} [+ PROPERTY {name value} ...] ... ;] ...
END PINPROPERTIES

PROPERTYDEFINITIONS
  [objectType name type [RANGE min max] [value | "string"] ;] ...
END PROPERTYDEFINITIONS

REGIONS n ;
  [- region {pt pt} ... [+ TYPE {FENCE | GUIDE}] [+ PROPERTY {name value} ...] ... ;] ...
END REGIONS

ROW name site x y orient [DO numX BY numY [STEP stepX stepY]] [+ PROPERTY {name value} ...] ... ;

SCANCHAINS n ;
  [- chain [+ PARTITION p [MAXBITS b]] [+ COMMONSCANPINS [( IN pin )] [( OUT pin )]]
      + START {comp | PIN} [pin]
      [+ FLOATING {comp [( IN pin )] [( OUT pin )] [( BITS b )]} ...]
      [+ ORDERED {comp [( IN pin )] [( OUT pin )] [( BITS b )]} ...] ...
      + STOP {comp | PIN} [pin] ;] ...
END SCANCHAINS

SPECIALNETS n ;
  [- net [( {comp pin | PIN pin} [+ SYNTHESIZED] )] ...
      [[+ COVER | + FIXED | + ROUTED] [+ SHAPE shape] [+ MASK m] + RECT layer pt pt
      | {+ COVER | + FIXED | + ROUTED} layer width [+ SHAPE shape] routingPoints
        [NEW layer width [+ SHAPE shape] routingPoints] ...] ...
      [+ SOURCE {DIST | NETLIST | TIMING | USER}] [+ FIXEDBUMP]
      [+ USE {ANALOG | CLOCK | GROUND | POWER | RESET | SCAN | SIGNAL | TIEOFF}]
      [+ WEIGHT w] [+ PROPERTY {name value} ...] ... ;] ...
END SPECIALNETS
  shape is one of RING PADRING BLOCKRING STRIPE FOLLOWPIN IOWIRE COREWIRE BLOCKWIRE BLOCKAGEWIRE FILLWIRE FILLWIREOPC DRCFILL

TRACKS {X | Y} start DO count STEP space [MASK m [SAMEMASK]] [LAYER layer ...] ;
UNITS DISTANCE MICRONS dbuPerMicron ;
VERSION 5.8 ;

VIAS n ;
  [- via [+ VIARULE rule + CUTSIZE x y + LAYERS bottom cut top + CUTSPACING x y
          + ENCLOSURE xb yb xt yt [+ ROWCOL rows cols] [+ ORIGIN x y]
          [+ OFFSET xb yb xt yt] [+ PATTERN p]]
        | [+ RECT layer pt pt] ... ;] ...
END VIAS

Routing points: ( x y [ext] ) followed by any of ( x y [ext] ), [MASK m] via [orient], or [MASK m] RECT ( dx1 dy1 dx2 dy2 ).

Rules that are often broken:
- A point is ( x y ) with integer coordinates. No arithmetic anywhere in the file.
- Orientations are N, S, W, E, FN, FS, FW or FE.
- A horizontal ROW has numY 1 and stepY 0; a vertical ROW has numX 1 and stepX 0. STEP always carries both values.
- TRACKS is a single statement, never a section with an END.
- Put semicolons and parentheses only where the forms above show them.

Follow these forms exactly and add nothing else."#;

/// Auxiliary library file handed to the model as technology context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFile {
    pub name: String,
    pub content: String,
}

impl LibraryFile {
    pub fn read(path: &Path) -> SynthesisResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| SynthesisError::io(path, source))?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { name, content })
    }
}

/// Renders the prompts for one run; the technology block is built once.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    technology: String,
}

impl PromptBuilder {
    pub fn new(libraries: &[LibraryFile]) -> Self {
        let listing = libraries
            .iter()
            .map(|lib| format!("File: {}\n```lef\n{}\n```", lib.name, lib.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let technology = format!(
            "You are a physical design engineer writing Design Exchange Format (DEF) files.\n\
             Each design you write should exercise as many distinct layout constructs as possible, \
             so that it drives the OpenROAD code paths that read them.\n\n\
             The technology platform is defined by these Library Exchange Format (LEF) files:\n\n\
             {listing}\n\n\
             Every design is checked by OpenROAD, so it must be syntactically valid. \
             Answer with the complete DEF design in one code block and nothing else."
        );

        Self { technology }
    }

    /// Read every library file from disk.
    pub fn load(paths: &[PathBuf]) -> SynthesisResult<Self> {
        let libraries = paths
            .iter()
            .map(|p| LibraryFile::read(p))
            .collect::<SynthesisResult<Vec<_>>>()?;
        Ok(Self::new(&libraries))
    }

    pub fn system_messages(
        &self,
        target_name: &str,
        target_content: &str,
        coverage_excerpt: &str,
    ) -> Vec<String> {
        let target = format!(
            "The design should reach as many lines as possible of the C++ file '{target_name}'.\n\n\
             Source of `{target_name}`:\n```cpp\n{target_content}\n```\n\n\
             Current line coverage of this file (line: hits):\n\n`{coverage_excerpt}`\n\n\
             Lines with zero hits are the ones to reach."
        );
        vec![self.technology.clone(), DEF_SYNTAX.to_string(), target]
    }

    pub fn initial_prompt(&self, target_name: &str) -> String {
        format!(
            "Start by listing to yourself every feature the OpenROAD file '{target_name}' handles. \
             Then write one DEF design that uses those features, aiming at the code in that file. \
             Prefer a rich design over a minimal one, as long as it stays valid for the platform above.\n\n\
             Reply with the design file only."
        )
    }

    pub fn feedback_prompt(&self, target_name: &str, candidate: &str, diagnostic: &str) -> String {
        format!(
            "OpenROAD rejected the design below, which was written to cover '{target_name}'.\n\n\
             Rejected design:\n```def\n{candidate}\n```\n\n\
             OpenROAD output:\n```text\n{diagnostic}\n```\n\n\
             Fix the reported errors and keep the rest of the design: every part should still \
             target a construct handled by '{target_name}', and coverage of that file is still the goal. \
             Do not add comments.\n\n\
             Reply with the corrected design file only."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> PromptBuilder {
        PromptBuilder::new(&[LibraryFile {
            name: "tech.lef".to_string(),
            content: "LAYER metal1\nEND metal1".to_string(),
        }])
    }

    #[test]
    fn test_system_messages() {
        let messages = builder().system_messages("defin.cpp", "int x;", "{1: 0}");

        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("File: tech.lef"));
        assert!(messages[0].contains("LAYER metal1"));
        assert!(messages[1].starts_with("A valid design is a DEF 5.8 file"));
        assert!(messages[2].contains("int x;"));
        assert!(messages[2].contains("`{1: 0}`"));
    }

    #[test]
    fn test_feedback_embeds_candidate_and_diagnostic() {
        let prompt = builder().feedback_prompt("defin.cpp", "DESIGN x ;", "ERROR: syntax error");

        assert!(prompt.contains("```def\nDESIGN x ;\n```"));
        assert!(prompt.contains("ERROR: syntax error"));
        assert!(prompt.contains("defin.cpp"));
    }

    #[test]
    fn test_initial_prompt_names_target() {
        assert!(builder().initial_prompt("lefin.cpp").contains("'lefin.cpp'"));
    }

    #[test]
    fn test_load_missing_library() {
        let err = PromptBuilder::load(&[PathBuf::from("/no/such/tech.lef")]).unwrap_err();
        assert!(matches!(err, SynthesisError::Io { .. }));
    }
}
