/*!

This is the long-form manual for `survey_stats` and `surveytab`.

## Quick start

Assume a short lunch poll. The survey is described in a JSON file, and the responses
come from a form export saved as CSV. The configuration file ties them together:

```json
{
  "survey": {
    "id": "lunch-2024",
    "title": "Lunch feedback",
    "startDate": "2024-01-01T00:00:00Z",
    "endDate": "2024-12-31T00:00:00Z",
    "questions": [
      { "id": 1, "text": "Main course", "questionType": "single",
        "options": [{ "id": 11, "text": "Fish" }, { "id": 12, "text": "Pasta" }] }
    ]
  },
  "responseSources": [
    { "provider": "csv", "filePath": "responses.csv", "idColumnIndex": 1 }
  ],
  "evaluationTime": "2024-06-01T00:00:00Z"
}
```

Running `surveytab --config lunch_config.json` prints a JSON summary: for each question,
the number of responses that answered it and the count of each label. Rejected
submissions are logged with their reason and counted under `rejected`. Use `--strict`
to stop at the first rejected submission instead.

See the `tests/data` directory for complete examples.

## Survey definition

| key            | meaning                                                    |
|----------------|------------------------------------------------------------|
| `id`           | identifier of the survey                                   |
| `title`        | displayed in the summary and in the Excel export           |
| `description`  | optional                                                   |
| `startDate`    | RFC 3339 timestamp, first instant of the window            |
| `endDate`      | RFC 3339 timestamp, last instant of the window             |
| `isActive`     | optional, defaults to `true`. An inactive survey is closed |
| `questions`    | the list of questions                                      |

Each question has an `id`, a `text`, a `questionType`, and optionally `isRequired`
(defaults to `true`) and `order` (defaults to its position in the list). The question types are:

* `single` one option among `options`
* `multiple` any number of `options`
* `matrix` one column of `matrixColumns` for each answered row of `matrixRows`
* `matrix_mul` any number of columns for each answered row
* `open` a free text answer

Options, rows and columns are written `{ "id": 11, "text": "Fish", "order": 1 }`, the
order being optional. The definition is rejected when a choice question has no option,
when a matrix question has no row or no column, when a question carries items that its
type does not use, or when ids or orders are duplicated.

## Input formats

The following providers are supported in `responseSources`:
* `json` the answer records of the submission API
* `csv` form exports as Comma Separated Values
* `xlsx` form exports as Excel workbooks

### `json`

```json
{ "responses": [
  { "id": "r1", "respondentName": "Ann", "submittedAt": "2024-03-01T10:00:00Z",
    "answers": [
      { "question": 1, "selectedOption": 11 },
      { "question": 3, "matrixRow": 31, "matrixColumn": 36 },
      { "question": 4, "textAnswer": "More salt" }
    ] }
] }
```

Each answer record carries exactly one payload: an option, a matrix cell or a text.
The records of a submission are grouped per question before validation. Two records
selecting different options of a `single` question reject the submission, as do two
columns for the same row of a `matrix` question. The keys `selected_option`,
`matrix_row`, `matrix_column`, `text_answer`, `respondent_name`, `respondent_email` and
`submitted_at` are accepted as well.

### `csv` and `xlsx`

One line per submission, one column per question. The header row holds the text of the
questions. Matrix questions use one column per row, headed `Question text [Row text]`.

| id | Main course | Sides       | Rate the service [Speed] | Comments  |
|----|-------------|-------------|--------------------------|-----------|
| c1 | Fish        | Fries;Rice  | Good                     | More salt |
| c2 | Pasta       |             |                          |           |

Cells hold the text of the options (or of the columns, for matrix questions). The
selections of `multiple` and `matrix_mul` questions are joined by the delimiter.
A label that the question does not define rejects the submission. Columns headed
`name` and `email` fill in the respondent. Other columns are ignored.

Options of a source:
* `idColumnIndex` the column holding the id of the submission. When it is missing, ids
  are made from the file name and the line number.
* `timestampColumnIndex` the column holding the submission time, in RFC 3339 or as
  `YYYY-MM-DD HH:MM:SS` (UTC). Excel dates are accepted.
* `headerRowIndex` (default 1) the row holding the header. The data rows follow it.
* `multipleDelimiter` (default `;`)
* `excelWorksheetName` the worksheet to read. It is required when the workbook has several
  worksheets.

Column indexes start at 1, or use the letters of the spreadsheet (`A`, `B`, ...).

## Survey window

A submission is checked against the window at its own submission time. Submissions
without a time are checked at `evaluationTime` (or `--now`), which defaults to the
current time. Both ends of the window are included.

## Outputs

* `outputSettings.outputPath` (or `--out`): where the JSON summary is written, `stdout`
  by default.
* `outputSettings.excelPath` (or `--excel`): an Excel workbook with one worksheet per
  question. Choice questions list every option with its count and percentage; matrix
  questions show the grid of counts.
* `--reference`: a summary to compare with. The differences are printed and the run fails.

Percentages of `multiple` questions are relative to the number of responses that answered
the question, so that they may add up to more than 100%. The other questions use the
number of answers.

Answers that cannot be traced back to the definition of the survey (an option that was
removed, for instance) are counted under the `unknown` label.

*/
