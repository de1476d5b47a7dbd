/*!

This is the long-form manual for `tabsniff` and `smedload`.

## What the tools do

Time-study records (for example SMED setup studies) are often exported from
spreadsheets that were built by hand. The export typically starts with a
title, a date, the name of the line or of the operator, and only then the
actual table. `smedload` finds where the table starts, reads it, and hands
back a clean table.

## Header detection

The first rows of the file are scanned (50 text lines for delimited files, 20
rows for spreadsheets). A row is a header candidate when it contains at least
two distinct keywords among:

`activity, duration, time, type, category, start, end, description, group`

and their Spanish counterparts
(`actividad, duración, tiempo, tipo, categoría, inicio, fin, descripción, grupo`).

Two strategies are available:
* `bestMatch` (default): the candidate with the most keywords wins, the earliest one in case of a tie.
* `firstMatch`: the first candidate wins.

When no row qualifies, the first row is used as the header. This is not an
error: the load proceeds and the report says that the header was a fallback.

A header row given explicitly (`--header-row 3`, or `"headerRowIndex": 3` in the
configuration) is always used as is, without any detection. The index starts at 0.

## Delimiters and encodings

Delimited files may use a comma, a semicolon or a tab. With `auto`, the header
line is split with each of them and the one producing the most columns wins
(comma first in case of a tie). If none of them produces more than one column,
the load fails and asks for an explicit delimiter.

The supported encodings are `utf-8` (default), `latin-1` and `cp1252`. A file
that is not valid under the chosen encoding is rejected: no character is ever
replaced silently.

## Malformed rows and numbers

Rows that do not have the same number of fields as the header are skipped. The
number of skipped rows is reported. A quote that is never closed only costs the
line it starts on: the lines it would have swallowed are read again one by one.

Durations may be written `12,5` or `12.5`. Values that cannot be read as a
number are replaced by `0` and counted in the report. Note that a decimal comma
inside a comma-delimited file must be quoted (`"12,5"`), otherwise the row has
one field too many and is skipped.

A number that carries both separators uses the last one as the decimal mark:
`1.234,5` and `1,234.5` both read `1234.5`. A separator repeated without the
other one groups thousands (`1.234.567`). A single comma is always a decimal
comma, so `1,234` reads `1.234`.

## Configuration

A configuration file is a JSON document. All the fields are optional:

```json
{
  "filePath": "study.csv",
  "delimiter": "auto",
  "encoding": "utf-8",
  "headerRowIndex": "auto",
  "headerStrategy": "bestMatch",
  "previewWindow": 50,
  "keywords": ["activity", "duration", "type"],
  "excelWorksheetName": "Sheet1",
  "columns": { "Activity": "Step", "DurationRaw": "Seconds" },
  "numericColumns": ["Operators"]
}
```

The `columns` entries map canonical fields (`Activity`, `Category`,
`CurrentType`, `ProposedType`, `DurationRaw`) to source columns. Fields that are
not given are suggested from the column names. The column chosen for
`DurationRaw` and the `numericColumns` are converted to numbers.

Clock columns (`Start time`, `End time`, `Hora inicio`, ...) are never suggested
for `DurationRaw`. A suggested duration column that holds text and no number at
all is left unmapped and keeps its text. Give `DurationRaw` explicitly to force
the conversion.

Command line options take precedence over the configuration file.

*/
